/// Loopback session state machine.
///
/// State transitions:
/// ```text
/// idle → opened → streaming → stopping → idle
///          ↓
///         idle (stop before start)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Opened,
    Streaming,
    Stopping,
}

impl LoopState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_opened(&self) -> bool {
        matches!(self, Self::Opened)
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::Streaming)
    }

    /// Whether a block loop may still be running.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Streaming | Self::Stopping)
    }
}

/// Counters for debugging a loopback session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopDiagnostics {
    pub blocks_read: u64,
    pub blocks_skipped: u64,
    pub empty_reads: u64,
    pub blocks_rendered: u64,
    pub bytes_rendered: u64,
    pub route_checks: u64,
}
