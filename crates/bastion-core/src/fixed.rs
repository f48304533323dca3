use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Convert an f64 to Fixed64. Use only for initialization, never in sim loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display, never in sim loop.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Convert a per-second rate into a per-tick rate.
///
/// A tick rate of zero is treated as one tick per second.
#[inline]
pub fn per_tick(per_second: Fixed64, ticks_per_second: u32) -> Fixed64 {
    let tps = ticks_per_second.max(1);
    per_second / Fixed64::from_num(tps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed64_round_trips_simple_values() {
        assert_eq!(fixed64_to_f64(f64_to_fixed64(3.5)), 3.5);
    }

    #[test]
    fn per_tick_divides_by_rate() {
        let rate = per_tick(f64_to_fixed64(10.0), 20);
        assert_eq!(rate, f64_to_fixed64(0.5));
    }

    #[test]
    fn per_tick_zero_rate_is_per_second() {
        let rate = per_tick(f64_to_fixed64(10.0), 0);
        assert_eq!(rate, f64_to_fixed64(10.0));
    }

    #[test]
    fn fixed64_determinism() {
        let a = f64_to_fixed64(1.0 / 3.0);
        let b = f64_to_fixed64(1.0 / 3.0);
        assert_eq!(a * f64_to_fixed64(3.0), b * f64_to_fixed64(3.0));
    }
}
