//! Test doubles shared by the unit tests of this crate.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use homelink_domain::button::Button;
use homelink_domain::command::{Command, CommandIntent, CommandKind};
use homelink_domain::device::Device;
use homelink_domain::error::HubError;
use homelink_domain::event::{Event, EventKind};
use homelink_domain::id::{ButtonId, DeviceId, ZoneId};
use homelink_domain::zone::Zone;

use crate::ports::{AutomationContext, Registry};
use crate::registry::InMemoryRegistry;

/// Registry-backed context that records dispatched intents.
#[derive(Default)]
pub(crate) struct FakeContext {
    pub registry: InMemoryRegistry,
    pub dispatched: Mutex<Vec<CommandIntent>>,
    pub fail: AtomicBool,
}

impl FakeContext {
    pub fn dispatched(&self) -> Vec<CommandIntent> {
        self.dispatched.lock().unwrap().clone()
    }
}

impl Registry for FakeContext {
    fn device(&self, id: DeviceId) -> Option<std::sync::Arc<Device>> {
        self.registry.device(id)
    }

    fn zone(&self, id: ZoneId) -> Option<Zone> {
        self.registry.zone(id)
    }

    fn button(&self, id: ButtonId) -> Option<Button> {
        self.registry.button(id)
    }
}

impl AutomationContext for FakeContext {
    async fn dispatch(&self, intent: CommandIntent) -> Result<(), HubError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(HubError::Action(format!("cannot deliver {intent}")));
        }
        self.dispatched.lock().unwrap().push(intent);
        Ok(())
    }
}

/// Build an event carrying `command`, classified accordingly.
pub(crate) fn event_for(command: Option<Command>) -> Event {
    let kind = match command.as_ref().map(|c| &c.kind) {
        Some(CommandKind::ZoneSetLevel { .. }) => EventKind::ZoneUpdate,
        Some(_) => EventKind::DeviceButton,
        None => EventKind::Unknown,
    };
    Event::new(DeviceId::new(), kind, command, "")
}

pub(crate) fn zone_event(zone_id: ZoneId, intensity: f64) -> Event {
    event_for(Some(Command {
        kind: CommandKind::ZoneSetLevel { zone_id, intensity },
        description: String::new(),
        wire: String::new(),
    }))
}

pub(crate) fn press_event(button_id: ButtonId) -> Event {
    event_for(Some(Command {
        kind: CommandKind::ButtonPress {
            device_id: DeviceId::new(),
            button_id,
        },
        description: String::new(),
        wire: String::new(),
    }))
}

/// Poll `condition` until it holds, failing the test after two seconds.
pub(crate) async fn wait_until(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
