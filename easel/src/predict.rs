use crate::{
    event::{Pointer, PointerAction, PointerEvent, PointerId},
    graphics::PixelPos,
};
use indexmap::IndexMap;

#[derive(Debug, Clone, Copy)]
struct Sample {
    pointer: Pointer,
    time_millis: i64,
}

/// Guesses where the pointers will be a few milliseconds from now by extrapolating their
/// latest velocity.
#[derive(Debug)]
pub struct MotionPredictor {
    enabled: bool,
    prediction_ms: i64,
    history: IndexMap<PointerId, (Option<Sample>, Sample)>,
    last_time: i64,
}

impl MotionPredictor {
    pub fn new(enabled: bool, prediction_ms: i64) -> Self {
        MotionPredictor {
            enabled,
            prediction_ms,
            history: IndexMap::new(),
            last_time: 0,
        }
    }

    pub fn record(&mut self, event: &PointerEvent) {
        match event.action {
            PointerAction::Down | PointerAction::Up | PointerAction::Cancel => {
                self.history.clear();
            }
            PointerAction::PointerUp => {
                if let Some(pointer) = event.action_pointer() {
                    self.history.shift_remove(&pointer.id);
                }
            }
            _ => {}
        }

        if matches!(event.action, PointerAction::Up | PointerAction::Cancel) {
            return;
        }

        self.last_time = event.time_millis;
        for pointer in event.pointers.iter() {
            let sample = Sample {
                pointer: *pointer,
                time_millis: event.time_millis,
            };

            self.history
                .entry(pointer.id)
                .and_modify(|(prev, latest)| {
                    if latest.time_millis < sample.time_millis {
                        *prev = Some(*latest);
                    }
                    *latest = sample;
                })
                .or_insert((None, sample));
        }
    }

    pub fn predict(&self) -> Option<PointerEvent> {
        if !self.enabled || self.prediction_ms <= 0 {
            return None;
        }

        let pointers = self
            .history
            .values()
            .map(|(prev, latest)| {
                let prev = prev.as_ref()?;
                let dt = (latest.time_millis - prev.time_millis) as f32;
                if dt <= 0. {
                    return None;
                }

                let ahead = self.prediction_ms as f32 / dt;
                let from = prev.pointer.location;
                let to = latest.pointer.location;
                Some(Pointer {
                    location: PixelPos {
                        x: to.x + (to.x - from.x) * ahead,
                        y: to.y + (to.y - from.y) * ahead,
                    },
                    ..latest.pointer
                })
            })
            .collect::<Option<Vec<_>>>()?;

        if pointers.is_empty() {
            return None;
        }

        Some(PointerEvent::new(
            PointerAction::Move,
            self.last_time + self.prediction_ms,
            pointers,
        ))
    }
}
