//! Sleepiness knob to kernel auto-disable thresholds.

use crate::config::{
    SLEEP_ANGULAR_THRESHOLD_MAX, SLEEP_ANGULAR_THRESHOLD_MIN, SLEEP_LINEAR_THRESHOLD_MAX,
    SLEEP_LINEAR_THRESHOLD_MIN, SLEEP_STEPS_MAX, SLEEP_STEPS_MIN, SLEEP_TIME_MAX, SLEEP_TIME_MIN,
};
use crate::kernel::AutoDisable;
use crate::utils::math::lerp;

/// Interpolates every threshold between its min and max constant.
/// Sleepiness 0 turns auto-disable off.
pub fn auto_disable_for(sleepiness: f32) -> AutoDisable {
    if !(sleepiness > 0.0) {
        return AutoDisable::default();
    }
    let t = sleepiness.min(1.0);
    AutoDisable {
        enabled: true,
        linear_threshold: lerp(SLEEP_LINEAR_THRESHOLD_MIN, SLEEP_LINEAR_THRESHOLD_MAX, t),
        angular_threshold: lerp(SLEEP_ANGULAR_THRESHOLD_MIN, SLEEP_ANGULAR_THRESHOLD_MAX, t),
        steps: lerp(SLEEP_STEPS_MIN, SLEEP_STEPS_MAX, t).round() as u32,
        time: lerp(SLEEP_TIME_MIN, SLEEP_TIME_MAX, t),
    }
}
