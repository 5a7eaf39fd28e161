//! Response classification

use rand::Rng;

/// What the scheduler does with a complete response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Follow: enqueue `location` as a new target
    Redirect { location: String },

    /// A redirect status with no usable `Location`; treated as broken
    RedirectWithoutLocation,

    /// 2xx; `respawn` asks for the same url to be enqueued again
    Success { respawn: bool },

    /// Anything else; recorded as broken with its status
    Broken,
}

/// Classifies a complete response
///
/// Redirect codes are checked first, so a configured redirect code always
/// wins over the 2xx range. `bonus_respawn` is a percentage.
pub fn classify<R: Rng + ?Sized>(
    status: u16,
    location: Option<&str>,
    redirect_codes: &[u16],
    bonus_respawn: u8,
    rng: &mut R,
) -> Disposition {
    if redirect_codes.contains(&status) {
        return match location.map(str::trim).filter(|l| !l.is_empty()) {
            Some(location) => Disposition::Redirect {
                location: location.to_string(),
            },
            None => Disposition::RedirectWithoutLocation,
        };
    }

    if (200..=299).contains(&status) {
        return Disposition::Success {
            respawn: roll_respawn(bonus_respawn, rng),
        };
    }

    Disposition::Broken
}

/// True with probability `bonus_respawn / 100`
pub fn roll_respawn<R: Rng + ?Sized>(bonus_respawn: u8, rng: &mut R) -> bool {
    bonus_respawn > 0 && rng.gen_range(0..100u8) < bonus_respawn
}
