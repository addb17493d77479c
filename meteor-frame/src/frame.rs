use chrono::{DateTime, TimeZone, Utc};

/// UTC timestamp expressed as fractional seconds since the Unix epoch.
///
/// The reference implementation threads a bare `double utc` through every
/// routine; we keep that representation here and convert to
/// [chrono::DateTime] only at the edges (logging, path naming) where calendar
/// fields are actually needed.
pub type UtcSeconds = f64;

/// One grid of `width` x `height` 8-bit luminance samples, tagged with the
/// UTC time it was captured.
#[derive(Clone, Debug)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub utc: UtcSeconds,
}

impl Frame {
    pub fn zeroed(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; (width as usize) * (height as usize)],
            utc: 0.0,
        }
    }

    #[inline]
    pub fn frame_size(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> u8 {
        self.data[(y * self.width + x) as usize]
    }

    /// Convert the stored UTC seconds into a calendar timestamp.
    pub fn timestamp(&self) -> DateTime<Utc> {
        utc_seconds_to_datetime(self.utc)
    }
}

/// Convert fractional UTC seconds into a [chrono::DateTime].
///
/// The distilled spec treats UTC<->calendar conversion as an external
/// collaborator; this helper is the engine's one seam onto it, used both by
/// frames and by the path namer.
pub fn utc_seconds_to_datetime(utc: UtcSeconds) -> DateTime<Utc> {
    let secs = utc.floor() as i64;
    let nanos = ((utc - utc.floor()) * 1_000_000_000.0).round() as u32;
    Utc.timestamp_opt(secs, nanos.min(999_999_999))
        .single()
        .unwrap_or_else(|| Utc.timestamp_opt(secs, 0).single().unwrap())
}
