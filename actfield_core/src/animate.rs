// Copyright 2026 the Actfield Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Precomputed keyframe animations.
//!
//! An [`Animation`] holds every frame between two states up front and moves a
//! cursor over them. Stepping forward and backward both clamp, so an
//! interrupted animation reverses from wherever it currently is instead of
//! snapping.
//!
//! With `frame_count = n` there are `n + 1` keyframes, evaluated at
//! `ease(i / n)` for `i` in `0..=n`. The cursor starts on the first one (the
//! `from` state), so `n` calls to [`step`](Animation::step) reach `to`.

use alloc::vec::Vec;

/// Easing curve mapping normalized time `t ∈ [0, 1]` to progress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Easing {
    /// Constant speed.
    #[default]
    Linear,
    /// Accelerate from zero velocity, quadratic.
    InQuad,
    /// Decelerate to zero velocity, quadratic.
    OutQuad,
    /// Accelerate then decelerate, quadratic.
    InOutQuad,
    /// Accelerate from zero velocity, cubic.
    InCubic,
    /// Decelerate to zero velocity, cubic.
    OutCubic,
    /// Accelerate then decelerate, cubic.
    InOutCubic,
}

impl Easing {
    /// Evaluates the curve at `t`.
    #[must_use]
    pub fn apply(self, t: f64) -> f64 {
        match self {
            Self::Linear => t,
            Self::InQuad => t * t,
            Self::OutQuad => t * (2.0 - t),
            Self::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
            Self::InCubic => t * t * t,
            Self::OutCubic => {
                let u = t - 1.0;
                u * u * u + 1.0
            }
            Self::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = -2.0 * t + 2.0;
                    1.0 - u * u * u / 2.0
                }
            }
        }
    }
}

/// Values that can be linearly interpolated.
pub trait Lerp: Copy {
    /// Returns `from + (to - from) * t`, component-wise for vectors.
    fn lerp(from: Self, to: Self, t: f64) -> Self;
}

impl Lerp for f64 {
    #[inline]
    fn lerp(from: Self, to: Self, t: f64) -> Self {
        from + (to - from) * t
    }
}

impl Lerp for f32 {
    #[inline]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "progress is in [0, 1]; single precision is plenty"
    )]
    fn lerp(from: Self, to: Self, t: f64) -> Self {
        from + (to - from) * t as Self
    }
}

impl<T: Lerp, const N: usize> Lerp for [T; N] {
    #[inline]
    fn lerp(from: Self, to: Self, t: f64) -> Self {
        core::array::from_fn(|i| T::lerp(from[i], to[i], t))
    }
}

/// A named, precomputed sequence of frames with a movable cursor.
#[derive(Clone, Debug)]
pub struct Animation<T> {
    name: &'static str,
    frames: Vec<T>,
    cursor: usize,
}

impl<T: Lerp> Animation<T> {
    /// Precomputes the frames from `from` to `to`.
    ///
    /// A `frame_count` of 0 yields a single frame holding `to`.
    #[must_use]
    pub fn new(name: &'static str, from: T, to: T, frame_count: usize, easing: Easing) -> Self {
        let frames = if frame_count == 0 {
            alloc::vec![to]
        } else {
            (0..=frame_count)
                .map(|i| T::lerp(from, to, easing.apply(i as f64 / frame_count as f64)))
                .collect()
        };
        Self {
            name,
            frames,
            cursor: 0,
        }
    }

    /// Advances one frame, clamped at the last, and returns it.
    pub fn step(&mut self) -> T {
        self.cursor = (self.cursor + 1).min(self.frames.len() - 1);
        self.frames[self.cursor]
    }

    /// Moves back one frame, clamped at the first, and returns it.
    pub fn reverse(&mut self) -> T {
        self.cursor = self.cursor.saturating_sub(1);
        self.frames[self.cursor]
    }

    /// The frame under the cursor.
    #[must_use]
    pub fn current(&self) -> T {
        self.frames[self.cursor]
    }
}

impl<T> Animation<T> {
    /// The name given at construction.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Cursor position in `0..=frame_count`.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of keyframes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always false; an animation has at least one frame.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Whether the cursor sits on the first frame.
    #[must_use]
    pub fn at_start(&self) -> bool {
        self.cursor == 0
    }

    /// Whether the cursor sits on the last frame.
    #[must_use]
    pub fn at_end(&self) -> bool {
        self.cursor + 1 == self.frames.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 0.005
    }

    #[test]
    fn linear_vector_steps_and_reverses() {
        let mut anim = Animation::new("t", [0.0, 0.0, 0.0], [0.0, 1.0, 0.0], 3, Easing::Linear);
        let ys: Vec<f64> = (0..3).map(|_| anim.step()[1]).collect();
        assert!(approx(ys[0], 0.33), "{ys:?}");
        assert!(approx(ys[1], 0.67), "{ys:?}");
        assert!(approx(ys[2], 1.0), "{ys:?}");

        let ys: Vec<f64> = (0..3).map(|_| anim.reverse()[1]).collect();
        assert!(approx(ys[0], 0.67), "{ys:?}");
        assert!(approx(ys[1], 0.33), "{ys:?}");
        assert!(approx(ys[2], 0.0), "{ys:?}");
    }

    #[test]
    fn cursor_clamps_at_both_ends() {
        let mut anim = Animation::new("clamp", 0.0, 10.0, 2, Easing::Linear);
        assert_eq!(anim.reverse(), 0.0);
        assert!(anim.at_start());
        assert_eq!(anim.step(), 5.0);
        assert_eq!(anim.step(), 10.0);
        assert_eq!(anim.step(), 10.0);
        assert!(anim.at_end());
    }

    #[test]
    fn interrupted_step_reverses_from_current() {
        let mut anim = Animation::new("pop", 0.0, 0.9, 3, Easing::Linear);
        anim.step();
        let mid = anim.step();
        assert!(approx(mid, 0.6));
        let back = anim.reverse();
        assert!(approx(back, 0.3), "reverse continues from the middle");
    }

    #[test]
    fn zero_frames_holds_target() {
        let mut anim = Animation::new("snap", 1.0_f32, 2.0, 0, Easing::Linear);
        assert_eq!(anim.current(), 2.0);
        assert_eq!(anim.step(), 2.0);
        assert_eq!(anim.reverse(), 2.0);
        assert_eq!(anim.len(), 1);
    }

    #[test]
    fn easings_hit_endpoints() {
        for e in [
            Easing::Linear,
            Easing::InQuad,
            Easing::OutQuad,
            Easing::InOutQuad,
            Easing::InCubic,
            Easing::OutCubic,
            Easing::InOutCubic,
        ] {
            assert!(approx(e.apply(0.0), 0.0), "{e:?} at 0");
            assert!(approx(e.apply(1.0), 1.0), "{e:?} at 1");
        }
        assert!(Easing::InQuad.apply(0.5) < 0.5);
        assert!(Easing::OutQuad.apply(0.5) > 0.5);
    }
}
