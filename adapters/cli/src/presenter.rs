use std::time::Duration;

use anyhow::Result;
use glam::Vec3;
use hellguard_core::EntityId;
use hellguard_rendering::{Cue, PresentationDriver};

/// Presentation driver that narrates the board through the log.
#[derive(Debug, Default)]
pub(crate) struct LogPresenter {
    tweens: usize,
    cues: usize,
}

impl LogPresenter {
    pub(crate) fn tweens(&self) -> usize {
        self.tweens
    }

    pub(crate) fn cues(&self) -> usize {
        self.cues
    }
}

impl PresentationDriver for LogPresenter {
    fn tween_entity(&mut self, entity: EntityId, target: Vec3, duration: Duration) -> Result<()> {
        self.tweens += 1;
        log::debug!(
            "{entity:?} -> ({:.2}, {:.2}, {:.2}) over {duration:?}",
            target.x,
            target.y,
            target.z
        );
        Ok(())
    }

    fn cue(&mut self, cue: Cue) -> Result<()> {
        self.cues += 1;
        match cue {
            Cue::Victory => log::info!("the adversary falls"),
            Cue::Defeat => log::info!("the player falls"),
            Cue::Unlocked { action } => log::info!("{action:?} unlocked"),
            Cue::Dying { entity } => log::info!("{entity:?} is destroyed"),
            other => log::debug!("{other:?}"),
        }
        Ok(())
    }
}
