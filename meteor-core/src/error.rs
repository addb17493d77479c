pub type Result<T> = std::result::Result<T, Error>;

/// Fatal engine errors. Per-cycle failures (a dropped frame, a failed
/// artifact write) never appear here — they are logged and the
/// observation loop continues or terminates cleanly on its own terms (see
/// `Engine::run`).
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Allocating the engine's fixed buffers failed at startup. Runtime
    /// allocations do not occur after construction, so this is the only
    /// point at which resource exhaustion can be observed.
    #[error("could not allocate {bytes} bytes for engine buffers")]
    Alloc { bytes: usize },
}
