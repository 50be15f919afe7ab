//! Command translation between wire frames and domain commands.
//!
//! Grammar (CRLF terminated, see [`crate::frame`]):
//!
//! ```text
//! <sentinel>OUTPUT,<zone>,1,<intensity:.2>      zone level
//! <sentinel>DEVICE,<device>,<button>,<3|4>      button press (3) / release (4)
//! ```
//!
//! Outbound commands always use the `#` sentinel. Everything here is pure:
//! no I/O, no shared state.

use homelink_domain::button::Button;
use homelink_domain::command::{
    Command, CommandIntent, CommandKind, MAX_INTENSITY, MIN_INTENSITY, validate_intensity,
};
use homelink_domain::device::Device;
use homelink_domain::event::{Event, EventKind};
use homelink_domain::zone::{OutputKind, Zone};

use crate::error::TranslateError;
use crate::frame::SENTINELS;

const OUTPUT: &str = "OUTPUT";
const DEVICE: &str = "DEVICE";
const OP_SET_LEVEL: &str = "1";
const ACTION_PRESS: &str = "3";
const ACTION_RELEASE: &str = "4";

/// Category of an inbound frame, decided by its keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    ZoneUpdate,
    DeviceButton,
    Unknown,
}

/// Splits `frame` into its comma-separated fields, sentinel and terminator removed.
fn fields(frame: &str) -> Option<Vec<&str>> {
    let mut chars = frame.trim_end_matches(['\r', '\n']).chars();
    let sentinel = chars.next()?;
    if !u8::try_from(sentinel).is_ok_and(|byte| SENTINELS.contains(&byte)) {
        return None;
    }
    Some(chars.as_str().split(',').map(str::trim).collect())
}

fn zone_description(zone: &Zone, intensity: f64) -> String {
    format!("Zone [{}] \"{}\" set to {intensity:.2}%", zone.id, zone.name)
}

fn button_description(device: &Device, button: &Button, verb: &str) -> String {
    format!(
        "Device [{}] \"{}\" {verb} button {} [{}]",
        device.id, device.name, button.local_id, button.id
    )
}

fn unresolved(kind: &'static str, id: impl ToString) -> TranslateError {
    TranslateError::Unresolved {
        kind,
        id: id.to_string(),
    }
}

/// Stateless translator for one hub's frames and commands.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandTranslator;

impl CommandTranslator {
    /// Classify a frame by keyword.
    #[must_use]
    pub fn classify(frame: &str) -> FrameKind {
        match fields(frame).as_deref().and_then(<[&str]>::first) {
            Some(&OUTPUT) => FrameKind::ZoneUpdate,
            Some(&DEVICE) => FrameKind::DeviceButton,
            _ => FrameKind::Unknown,
        }
    }

    /// Turn a frame read from `hub` into an event.
    ///
    /// Returns `Ok(None)` for frames that carry nothing to report: unknown
    /// keywords and unknown op or action codes.
    ///
    /// # Errors
    ///
    /// Returns [`TranslateError::Parse`] for a malformed frame and
    /// [`TranslateError::Unresolved`] when it names a zone, device or button
    /// the hub does not have. Both mean the frame is dropped.
    pub fn translate(&self, hub: &Device, frame: &str) -> Result<Option<Event>, TranslateError> {
        let kind = Self::classify(frame);
        let command = match kind {
            FrameKind::ZoneUpdate => self.parse_zone_update(hub, frame)?,
            FrameKind::DeviceButton => self.parse_button_event(hub, frame)?,
            FrameKind::Unknown => return Ok(None),
        };
        let kind = match kind {
            FrameKind::ZoneUpdate => EventKind::ZoneUpdate,
            _ => EventKind::DeviceButton,
        };
        Ok(command.map(|command| Event::new(hub.id, kind, Some(command), frame)))
    }

    fn parse_zone_update(&self, hub: &Device, frame: &str) -> Result<Option<Command>, TranslateError> {
        let malformed = || TranslateError::Parse(frame.to_string());
        let fields = fields(frame).ok_or_else(malformed)?;
        let [_, zone_local, op, rest @ ..] = fields.as_slice() else {
            return Err(malformed());
        };
        let zone = hub
            .zones
            .get(*zone_local)
            .ok_or_else(|| unresolved("zone", zone_local))?;
        if *op != OP_SET_LEVEL {
            tracing::debug!(zone = %zone.name, op, "ignoring unknown output op");
            return Ok(None);
        }
        let intensity: f64 = rest
            .first()
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(malformed)?;
        validate_intensity(intensity).map_err(|_| malformed())?;
        Ok(Some(Command {
            kind: CommandKind::ZoneSetLevel {
                zone_id: zone.id,
                intensity,
            },
            description: zone_description(zone, intensity),
            wire: frame.to_string(),
        }))
    }

    fn parse_button_event(&self, hub: &Device, frame: &str) -> Result<Option<Command>, TranslateError> {
        let malformed = || TranslateError::Parse(frame.to_string());
        let fields = fields(frame).ok_or_else(malformed)?;
        let [_, device_local, button_local, action, ..] = fields.as_slice() else {
            return Err(malformed());
        };
        let device = if *device_local == hub.local_id {
            hub
        } else {
            hub.devices
                .get(*device_local)
                .ok_or_else(|| unresolved("device", device_local))?
        };
        let button = device
            .buttons
            .get(*button_local)
            .ok_or_else(|| unresolved("button", button_local))?;
        let (kind, verb) = match *action {
            ACTION_PRESS => (
                CommandKind::ButtonPress {
                    device_id: device.id,
                    button_id: button.id,
                },
                "press",
            ),
            ACTION_RELEASE => (
                CommandKind::ButtonRelease {
                    device_id: device.id,
                    button_id: button.id,
                },
                "release",
            ),
            other => {
                tracing::debug!(device = %device.name, action = other, "ignoring unknown button action");
                return Ok(None);
            }
        };
        Ok(Some(Command {
            kind,
            description: button_description(device, button, verb),
            wire: frame.to_string(),
        }))
    }

    /// Render an intent addressed to `hub` (or a device behind it) to wire form.
    ///
    /// Zones resolve among the hub's own zones and devices among the hub and
    /// its direct children, the same scopes `translate` reads frames from.
    ///
    /// # Errors
    ///
    /// Returns [`TranslateError::IntensityOutOfRange`] for a level outside
    /// 0–100, [`TranslateError::Unresolved`] when the target is not part of
    /// `hub`, and [`TranslateError::UnsupportedTarget`] when a binary zone is
    /// asked for an intermediate level.
    pub fn render(&self, hub: &Device, intent: &CommandIntent) -> Result<Command, TranslateError> {
        match *intent {
            CommandIntent::SetZoneLevel { zone_id, intensity } => {
                if !(MIN_INTENSITY..=MAX_INTENSITY).contains(&intensity) {
                    return Err(TranslateError::IntensityOutOfRange(intensity));
                }
                let zone = hub
                    .zones
                    .values()
                    .find(|zone| zone.id == zone_id)
                    .ok_or_else(|| unresolved("zone", zone_id))?;
                if zone.output == OutputKind::Binary
                    && intensity != MIN_INTENSITY
                    && intensity != MAX_INTENSITY
                {
                    return Err(TranslateError::UnsupportedTarget(format!(
                        "binary zone {} cannot be set to {intensity:.2}",
                        zone.name
                    )));
                }
                Ok(Command {
                    kind: intent.to_kind(),
                    description: zone_description(zone, intensity),
                    wire: format!("#{OUTPUT},{},{OP_SET_LEVEL},{intensity:.2}\r\n", zone.local_id),
                })
            }
            CommandIntent::PressButton {
                device_id,
                button_id,
            }
            | CommandIntent::ReleaseButton {
                device_id,
                button_id,
            } => {
                let device = if hub.id == device_id {
                    hub
                } else {
                    hub.devices
                        .values()
                        .find(|device| device.id == device_id)
                        .ok_or_else(|| unresolved("device", device_id))?
                };
                let button = device
                    .buttons
                    .values()
                    .find(|button| button.id == button_id)
                    .ok_or_else(|| unresolved("button", button_id))?;
                let (action, verb) = match intent {
                    CommandIntent::PressButton { .. } => (ACTION_PRESS, "press"),
                    _ => (ACTION_RELEASE, "release"),
                };
                Ok(Command {
                    kind: intent.to_kind(),
                    description: button_description(device, button, verb),
                    wire: format!(
                        "#{DEVICE},{},{},{action}\r\n",
                        device.local_id, button.local_id
                    ),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use homelink_domain::device::ConnectionSettings;
    use homelink_domain::id::{ButtonId, DeviceId, ZoneId};

    fn hub() -> Device {
        let mut hub = Device::builder()
            .local_id("1")
            .name("Smart Bridge")
            .address("10.0.0.2:23")
            .connection(ConnectionSettings::default())
            .build()
            .unwrap();
        hub.add_zone(
            Zone::builder()
                .local_id("12")
                .name("Kitchen")
                .build()
                .unwrap(),
        )
        .unwrap();
        hub.add_zone(
            Zone::builder()
                .local_id("13")
                .name("Porch")
                .output(OutputKind::Binary)
                .build()
                .unwrap(),
        )
        .unwrap();
        hub.add_button(Button::new("100", Some("Evening".to_string())).unwrap())
            .unwrap();
        let mut keypad = Device::builder()
            .local_id("9")
            .name("Hallway keypad")
            .address("9")
            .build()
            .unwrap();
        keypad.add_button(Button::new("3", None).unwrap()).unwrap();
        hub.add_device(keypad).unwrap();
        hub
    }

    #[test]
    fn should_classify_by_keyword() {
        assert_eq!(
            CommandTranslator::classify("~OUTPUT,12,1,55.00\r\n"),
            FrameKind::ZoneUpdate
        );
        assert_eq!(
            CommandTranslator::classify("#DEVICE,9,3,3\r\n"),
            FrameKind::DeviceButton
        );
        assert_eq!(
            CommandTranslator::classify("~ERROR,6\r\n"),
            FrameKind::Unknown
        );
        assert_eq!(CommandTranslator::classify("GNET> "), FrameKind::Unknown);
    }

    #[test]
    fn should_translate_zone_update() {
        let hub = hub();
        let zone = &hub.zones["12"];

        let event = CommandTranslator
            .translate(&hub, "#OUTPUT,12,1,55.00\r\n")
            .unwrap()
            .unwrap();

        assert_eq!(event.kind, EventKind::ZoneUpdate);
        assert_eq!(event.device_id, hub.id);
        assert_eq!(event.zone_level(), Some((zone.id, 55.0)));
        assert_eq!(event.raw, "#OUTPUT,12,1,55.00\r\n");
        let command = event.command.unwrap();
        assert_eq!(
            command.description,
            format!("Zone [{}] \"Kitchen\" set to 55.00%", zone.id)
        );
    }

    #[test]
    fn should_translate_button_press_and_release() {
        let hub = hub();
        let keypad = &hub.devices["9"];
        let button = &keypad.buttons["3"];

        let press = CommandTranslator
            .translate(&hub, "~DEVICE,9,3,3\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(press.kind, EventKind::DeviceButton);
        assert_eq!(press.pressed_button(), Some(button.id));

        let release = CommandTranslator
            .translate(&hub, "~DEVICE,9,3,4\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(release.released_button(), Some(button.id));
        assert_eq!(
            release.command.unwrap().description,
            format!(
                "Device [{}] \"Hallway keypad\" release button 3 [{}]",
                keypad.id, button.id
            )
        );
    }

    #[test]
    fn should_resolve_buttons_on_the_hub_itself() {
        let hub = hub();
        let event = CommandTranslator
            .translate(&hub, "~DEVICE,1,100,3\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(event.pressed_button(), Some(hub.buttons["100"].id));
    }

    #[test]
    fn should_drop_frame_for_unknown_device() {
        let result = CommandTranslator.translate(&hub(), "~DEVICE,42,3,3\r\n");
        assert!(matches!(
            result,
            Err(TranslateError::Unresolved { kind: "device", .. })
        ));
    }

    #[test]
    fn should_drop_frame_for_unknown_zone() {
        let result = CommandTranslator.translate(&hub(), "~OUTPUT,99,1,10.00\r\n");
        assert!(matches!(
            result,
            Err(TranslateError::Unresolved { kind: "zone", .. })
        ));
    }

    #[test]
    fn should_yield_no_event_for_unknown_codes() {
        let hub = hub();
        assert_eq!(
            CommandTranslator.translate(&hub, "~OUTPUT,12,2,1.00\r\n"),
            Ok(None)
        );
        assert_eq!(
            CommandTranslator.translate(&hub, "~DEVICE,9,3,9\r\n"),
            Ok(None)
        );
        assert_eq!(CommandTranslator.translate(&hub, "~ERROR,6\r\n"), Ok(None));
    }

    #[test]
    fn should_reject_malformed_frames() {
        let hub = hub();
        assert!(matches!(
            CommandTranslator.translate(&hub, "~OUTPUT,12,1,bright\r\n"),
            Err(TranslateError::Parse(_))
        ));
        assert!(matches!(
            CommandTranslator.translate(&hub, "~DEVICE,9\r\n"),
            Err(TranslateError::Parse(_))
        ));
    }

    #[test]
    fn should_render_zone_level_with_two_decimals() {
        let hub = hub();
        let zone_id = hub.zones["12"].id;

        let command = CommandTranslator
            .render(
                &hub,
                &CommandIntent::SetZoneLevel {
                    zone_id,
                    intensity: 55.0,
                },
            )
            .unwrap();

        assert_eq!(command.wire, "#OUTPUT,12,1,55.00\r\n");
        assert_eq!(command.to_string(), format!("Zone [{zone_id}] \"Kitchen\" set to 55.00%"));
    }

    #[test]
    fn should_render_button_commands() {
        let hub = hub();
        let keypad = &hub.devices["9"];
        let button_id = keypad.buttons["3"].id;

        let press = CommandTranslator
            .render(
                &hub,
                &CommandIntent::PressButton {
                    device_id: keypad.id,
                    button_id,
                },
            )
            .unwrap();
        let release = CommandTranslator
            .render(
                &hub,
                &CommandIntent::ReleaseButton {
                    device_id: keypad.id,
                    button_id,
                },
            )
            .unwrap();

        assert_eq!(press.wire, "#DEVICE,9,3,3\r\n");
        assert_eq!(release.wire, "#DEVICE,9,3,4\r\n");
    }

    #[test]
    fn should_round_trip_zone_levels() {
        let hub = hub();
        let zone_id = hub.zones["12"].id;
        for hundredths in (0..=10_000).step_by(37).chain([10_000]) {
            let intensity = f64::from(hundredths) / 100.0;
            let command = CommandTranslator
                .render(&hub, &CommandIntent::SetZoneLevel { zone_id, intensity })
                .unwrap();

            let event = CommandTranslator
                .translate(&hub, &command.wire)
                .unwrap()
                .unwrap();

            let (parsed_zone, parsed) = event.zone_level().unwrap();
            assert_eq!(parsed_zone, zone_id);
            assert!((parsed - intensity).abs() < 0.005, "{intensity} -> {parsed}");
        }
    }

    #[test]
    fn should_reject_render_errors() {
        let hub = hub();
        let porch = hub.zones["13"].id;
        assert_eq!(
            CommandTranslator.render(
                &hub,
                &CommandIntent::SetZoneLevel {
                    zone_id: hub.zones["12"].id,
                    intensity: 101.0
                }
            ),
            Err(TranslateError::IntensityOutOfRange(101.0))
        );
        assert!(matches!(
            CommandTranslator.render(
                &hub,
                &CommandIntent::SetZoneLevel {
                    zone_id: porch,
                    intensity: 50.0
                }
            ),
            Err(TranslateError::UnsupportedTarget(_))
        ));
        assert!(CommandTranslator
            .render(
                &hub,
                &CommandIntent::SetZoneLevel {
                    zone_id: porch,
                    intensity: 100.0
                }
            )
            .is_ok());
        assert!(matches!(
            CommandTranslator.render(
                &hub,
                &CommandIntent::PressButton {
                    device_id: DeviceId::new(),
                    button_id: ButtonId::new()
                }
            ),
            Err(TranslateError::Unresolved { kind: "device", .. })
        ));
        assert!(matches!(
            CommandTranslator.render(
                &hub,
                &CommandIntent::SetZoneLevel {
                    zone_id: ZoneId::new(),
                    intensity: 1.0
                }
            ),
            Err(TranslateError::Unresolved { kind: "zone", .. })
        ));
    }

    #[test]
    fn should_reject_non_finite_or_out_of_range_inbound_levels() {
        let hub = hub();
        for raw in ["NaN", "inf", "-5.00", "250.00"] {
            let frame = format!("~OUTPUT,12,1,{raw}\r\n");
            assert!(
                matches!(
                    CommandTranslator.translate(&hub, &frame),
                    Err(TranslateError::Parse(_))
                ),
                "{raw}"
            );
        }
    }

    #[test]
    fn should_only_render_zones_owned_by_the_hub() {
        let mut hub = hub();
        let mut dimmer = Device::builder()
            .local_id("20")
            .name("Den dimmer")
            .address("20")
            .build()
            .unwrap();
        dimmer
            .add_zone(Zone::builder().local_id("12").name("Den").build().unwrap())
            .unwrap();
        hub.add_device(dimmer).unwrap();
        let den = hub.devices["20"].zones["12"].id;

        let result = CommandTranslator.render(
            &hub,
            &CommandIntent::SetZoneLevel {
                zone_id: den,
                intensity: 40.0,
            },
        );

        assert!(matches!(
            result,
            Err(TranslateError::Unresolved { kind: "zone", .. })
        ));
    }

    #[test]
    fn should_only_render_buttons_of_the_hub_or_direct_children() {
        let mut hub = hub();
        let mut remote = Device::builder()
            .local_id("31")
            .name("Pico remote")
            .address("31")
            .build()
            .unwrap();
        remote.add_button(Button::new("2", None).unwrap()).unwrap();
        let mut repeater = Device::builder()
            .local_id("30")
            .name("Repeater")
            .address("30")
            .build()
            .unwrap();
        repeater.add_device(remote).unwrap();
        hub.add_device(repeater).unwrap();
        let remote = &hub.devices["30"].devices["31"];

        let nested = CommandTranslator.render(
            &hub,
            &CommandIntent::PressButton {
                device_id: remote.id,
                button_id: remote.buttons["2"].id,
            },
        );
        let own = CommandTranslator
            .render(
                &hub,
                &CommandIntent::PressButton {
                    device_id: hub.id,
                    button_id: hub.buttons["100"].id,
                },
            )
            .unwrap();

        assert!(matches!(
            nested,
            Err(TranslateError::Unresolved { kind: "device", .. })
        ));
        assert_eq!(own.wire, "#DEVICE,1,100,3\r\n");
    }
}
