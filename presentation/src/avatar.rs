//! Avatar animation selection.
//!
//! The chat avatar plays one looping clip per [`AnimationCue`]. Clip names
//! follow the `CharacterArmature|<Clip>` convention of the bundled model.

use parley_domain::AnimationCue;

pub const IDLE_ANIMATION: &str = "CharacterArmature|Idle";
pub const THINKING_ANIMATION: &str = "CharacterArmature|Jump";
pub const ERROR_ANIMATION: &str = "CharacterArmature|Death";

/// Clip to play for a cue.
pub fn animation_for(cue: AnimationCue) -> &'static str {
    match cue {
        AnimationCue::Idle => IDLE_ANIMATION,
        AnimationCue::Thinking => THINKING_ANIMATION,
        AnimationCue::Error => ERROR_ANIMATION,
    }
}

/// Tracks the clip currently playing so it is only restarted on a change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarAnimator {
    current: &'static str,
}

impl Default for AvatarAnimator {
    fn default() -> Self {
        Self {
            current: IDLE_ANIMATION,
        }
    }
}

impl AvatarAnimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &'static str {
        self.current
    }

    /// Switch to the clip for `cue`. Returns the new clip if it changed.
    pub fn update(&mut self, cue: AnimationCue) -> Option<&'static str> {
        let next = animation_for(cue);
        if next == self.current {
            return None;
        }
        self.current = next;
        Some(next)
    }
}
