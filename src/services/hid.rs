//! The HID over GATT service
//!
//! A HID device publishes a USB style report descriptor (the *report map* in BLE) plus one
//! report characteristic per report it describes. Hosts learn the layout of the reports from
//! the map and receive input reports as notifications.

use crate::adapter::{Adapter, CharacteristicHandle, LocalService};
use crate::attribute::{Properties, Property, SecurityMode};
use crate::characteristic::{Characteristic, Descriptor, ValueError};
use crate::radio::BleRadio;
use crate::uuid::Uuid;
use crate::Error;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

pub const SERVICE_UUID: Uuid = Uuid::from_u16(0x1812);

const REPORT_UUID: Uuid = Uuid::from_u16(0x2A4D);
const REPORT_MAP_UUID: Uuid = Uuid::from_u16(0x2A4B);
const HID_INFORMATION_UUID: Uuid = Uuid::from_u16(0x2A4A);
const CONTROL_POINT_UUID: Uuid = Uuid::from_u16(0x2A4C);
const PROTOCOL_MODE_UUID: Uuid = Uuid::from_u16(0x2A4E);
const REPORT_REFERENCE_UUID: Uuid = Uuid::from_u16(0x2908);

/// Appearance categories commonly advertised alongside this service
pub const APPEARANCE_KEYBOARD: u16 = 961;
pub const APPEARANCE_MOUSE: u16 = 962;
pub const APPEARANCE_JOYSTICK: u16 = 963;
pub const APPEARANCE_GAMEPAD: u16 = 964;

pub const PROTOCOL_MODE_BOOT: u8 = 0;
pub const PROTOCOL_MODE_REPORT: u8 = 1;

// bcdHID 1.1, no country code, normally connectable
const HID_INFORMATION_VALUE: [u8; 4] = [0x01, 0x01, 0x00, 0x02];

// report types within a report reference descriptor
const REPORT_TYPE_INPUT: u8 = 1;
const REPORT_TYPE_OUTPUT: u8 = 2;

/// A report map describing a keyboard, a mouse and a consumer control device
pub const DEFAULT_REPORT_MAP: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x06, // Usage (Keyboard)
    0xA1, 0x01, // Collection (Application)
    0x85, 0x01, //   Report ID (1)
    0x05, 0x07, //   Usage Page (Keyboard/Keypad)
    0x19, 0xE0, //   Usage Minimum
    0x29, 0xE7, //   Usage Maximum
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x08, //   Report Count (8)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    0x81, 0x01, //   Input (Constant)
    0x19, 0x00, //   Usage Minimum
    0x29, 0x89, //   Usage Maximum
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x89, //   Logical Maximum (137)
    0x75, 0x08, //   Report Size (8)
    0x95, 0x06, //   Report Count (6)
    0x81, 0x00, //   Input (Data, Array, Absolute)
    0x05, 0x08, //   Usage Page (LEDs)
    0x19, 0x01, //   Usage Minimum (Num Lock)
    0x29, 0x05, //   Usage Maximum (Kana)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x05, //   Report Count (5)
    0x91, 0x02, //   Output (Data, Variable, Absolute)
    0x95, 0x03, //   Report Count (3)
    0x91, 0x01, //   Output (Constant)
    0xC0, // End Collection
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x02, // Usage (Mouse)
    0xA1, 0x01, // Collection (Application)
    0x09, 0x01, //   Usage (Pointer)
    0xA1, 0x00, //   Collection (Physical)
    0x85, 0x02, //     Report ID (2)
    0x05, 0x09, //     Usage Page (Button)
    0x19, 0x01, //     Usage Minimum
    0x29, 0x05, //     Usage Maximum
    0x15, 0x00, //     Logical Minimum (0)
    0x25, 0x01, //     Logical Maximum (1)
    0x95, 0x05, //     Report Count (5)
    0x75, 0x01, //     Report Size (1)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    0x95, 0x01, //     Report Count (1)
    0x75, 0x03, //     Report Size (3)
    0x81, 0x01, //     Input (Constant)
    0x05, 0x01, //     Usage Page (Generic Desktop)
    0x09, 0x30, //     Usage (X)
    0x09, 0x31, //     Usage (Y)
    0x15, 0x81, //     Logical Minimum (-127)
    0x25, 0x7F, //     Logical Maximum (127)
    0x75, 0x08, //     Report Size (8)
    0x95, 0x02, //     Report Count (2)
    0x81, 0x06, //     Input (Data, Variable, Relative)
    0x09, 0x38, //     Usage (Wheel)
    0x15, 0x81, //     Logical Minimum (-127)
    0x25, 0x7F, //     Logical Maximum (127)
    0x75, 0x08, //     Report Size (8)
    0x95, 0x01, //     Report Count (1)
    0x81, 0x06, //     Input (Data, Variable, Relative)
    0xC0, //   End Collection
    0xC0, // End Collection
    0x05, 0x0C, // Usage Page (Consumer)
    0x09, 0x01, // Usage (Consumer Control)
    0xA1, 0x01, // Collection (Application)
    0x85, 0x03, //   Report ID (3)
    0x75, 0x10, //   Report Size (16)
    0x95, 0x01, //   Report Count (1)
    0x15, 0x01, //   Logical Minimum (1)
    0x26, 0x8C, 0x02, //   Logical Maximum (652)
    0x19, 0x01, //   Usage Minimum (Consumer Control)
    0x2A, 0x8C, 0x02, //   Usage Maximum (AC Send)
    0x81, 0x00, //   Input (Data, Array, Absolute)
    0xC0, // End Collection
];

/// The byte sizes of one report described by a report map
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReportInfo {
    pub report_id: u8,
    /// Bytes of the input report, zero when the report has no input fields
    pub input_len: usize,
    /// Bytes of the output report, zero when the report has no output fields
    pub output_len: usize,
}

/// Walk the short items of a report map and total the input and output bits of every report
///
/// Report size, report count and report id are global items, so a flat walk over the map
/// accumulates the same totals as a walk of the collection tree.
fn parse_report_map(map: &[u8]) -> Result<Vec<ReportInfo>, Error> {
    const TYPE_MAIN: u8 = 0;
    const TYPE_GLOBAL: u8 = 1;
    const TYPE_LOCAL: u8 = 2;

    const TAG_INPUT: u8 = 0b1000;
    const TAG_OUTPUT: u8 = 0b1001;
    const TAG_BEGIN_COLLECTION: u8 = 0b1010;
    const TAG_FEATURE: u8 = 0b1011;
    const TAG_END_COLLECTION: u8 = 0b1100;

    const TAG_REPORT_SIZE: u8 = 7;
    const TAG_REPORT_ID: u8 = 8;
    const TAG_REPORT_COUNT: u8 = 9;

    // report id to (input bits, output bits)
    let mut bits: BTreeMap<u8, (usize, usize)> = BTreeMap::new();

    let mut report_id = 0u8;
    let mut report_size = 0usize;
    let mut report_count = 0usize;

    let mut rest = map;

    while let Some((&prefix, after)) = rest.split_first() {
        let size = match prefix & 0b11 {
            3 => 4,
            n => n as usize,
        };

        if after.len() < size {
            return Err(Error::InvalidReportMap("item data is truncated"));
        }

        let (data, after_data) = after.split_at(size);

        rest = after_data;

        let value = data
            .iter()
            .rev()
            .fold(0usize, |acc, byte| (acc << 8) | usize::from(*byte));

        match ((prefix >> 2) & 0b11, prefix >> 4) {
            (TYPE_GLOBAL, TAG_REPORT_SIZE) => report_size = value,
            (TYPE_GLOBAL, TAG_REPORT_ID) => report_id = value as u8,
            (TYPE_GLOBAL, TAG_REPORT_COUNT) => report_count = value,
            (TYPE_GLOBAL, _) | (TYPE_LOCAL, _) => {}
            (TYPE_MAIN, TAG_INPUT) => {
                bits.entry(report_id).or_default().0 += report_size * report_count;
            }
            (TYPE_MAIN, TAG_OUTPUT) => {
                bits.entry(report_id).or_default().1 += report_size * report_count;
            }
            (TYPE_MAIN, TAG_FEATURE | TAG_BEGIN_COLLECTION | TAG_END_COLLECTION) => {}
            (TYPE_MAIN, _) => return Err(Error::InvalidReportMap("unsupported main item")),
            _ => return Err(Error::InvalidReportMap("long items are not supported")),
        }
    }

    Ok(bits
        .into_iter()
        .map(|(report_id, (input, output))| ReportInfo {
            report_id,
            input_len: input / 8,
            output_len: output / 8,
        })
        .collect())
}

struct BoundReport {
    info: ReportInfo,
    input: Option<CharacteristicHandle>,
    output: Option<CharacteristicHandle>,
}

/// The HID service published by the local GATT server
///
/// One characteristic is registered per report direction described by the report map, each
/// carrying a report reference descriptor so hosts can tie it back to the map.
pub struct HidServer<A: Adapter> {
    adapter: Rc<RefCell<A>>,
    reports: Vec<BoundReport>,
    protocol_mode: CharacteristicHandle,
}

impl<A: Adapter> HidServer<A> {
    /// Register the service with the default keyboard, mouse and consumer control map
    pub fn register(radio: &BleRadio<A>) -> Result<Self, Error> {
        Self::register_with_map(radio, DEFAULT_REPORT_MAP)
    }

    /// Register the service with the given report map
    pub fn register_with_map(radio: &BleRadio<A>, report_map: &[u8]) -> Result<Self, Error> {
        let infos = parse_report_map(report_map)?;

        let read_notify: Properties = [Property::Read, Property::Notify].into_iter().collect();

        let host_writable: Properties =
            [Property::Read, Property::Write, Property::WriteWithoutResponse]
                .into_iter()
                .collect();

        let mut service = LocalService::new(SERVICE_UUID)
            .with_characteristic(
                Characteristic::new(PROTOCOL_MODE_UUID)
                    .with_properties(
                        [Property::Read, Property::WriteWithoutResponse].into_iter().collect(),
                    )
                    .with_max_length(1)
                    .fixed_length()
                    .with_initial_value(vec![PROTOCOL_MODE_REPORT]),
            )
            .with_characteristic(
                Characteristic::new(HID_INFORMATION_UUID)
                    .readable_when(SecurityMode::EncryptNoMitm)
                    .with_max_length(HID_INFORMATION_VALUE.len())
                    .fixed_length()
                    .with_initial_value(HID_INFORMATION_VALUE.to_vec()),
            )
            .with_characteristic(
                Characteristic::new(REPORT_MAP_UUID)
                    .readable_when(SecurityMode::EncryptNoMitm)
                    .with_max_length(report_map.len())
                    .fixed_length()
                    .with_initial_value(report_map.to_vec()),
            )
            .with_characteristic(
                Characteristic::new(CONTROL_POINT_UUID)
                    .with_properties([Property::WriteWithoutResponse].into_iter().collect())
                    .writable_when(SecurityMode::EncryptNoMitm)
                    .with_max_length(1)
                    .fixed_length(),
            );

        // report characteristic positions after the four fixed ones, in registration order
        let mut placements: Vec<(usize, bool)> = Vec::new();

        for (index, info) in infos.iter().enumerate() {
            if info.output_len > 0 {
                placements.push((index, false));

                service = service.with_characteristic(
                    Characteristic::new(REPORT_UUID)
                        .with_properties(host_writable)
                        .readable_when(SecurityMode::EncryptNoMitm)
                        .writable_when(SecurityMode::EncryptNoMitm)
                        .with_max_length(info.output_len)
                        .fixed_length()
                        .with_initial_value(vec![0; info.output_len])
                        .with_descriptor(
                            Descriptor::new(
                                REPORT_REFERENCE_UUID,
                                vec![info.report_id, REPORT_TYPE_OUTPUT],
                            )
                            .readable_when(SecurityMode::EncryptNoMitm),
                        ),
                );
            }

            if info.input_len > 0 {
                placements.push((index, true));

                service = service.with_characteristic(
                    Characteristic::new(REPORT_UUID)
                        .with_properties(read_notify)
                        .readable_when(SecurityMode::EncryptNoMitm)
                        .with_max_length(info.input_len)
                        .fixed_length()
                        .with_initial_value(vec![0; info.input_len])
                        .with_descriptor(
                            Descriptor::new(
                                REPORT_REFERENCE_UUID,
                                vec![info.report_id, REPORT_TYPE_INPUT],
                            )
                            .readable_when(SecurityMode::EncryptNoMitm),
                        ),
                );
            }
        }

        let handles = radio.adapter().borrow_mut().register_service(&service)?;

        let mut reports: Vec<BoundReport> = infos
            .iter()
            .map(|info| BoundReport {
                info: *info,
                input: None,
                output: None,
            })
            .collect();

        for (position, (index, is_input)) in placements.into_iter().enumerate() {
            let (_, handle) = handles[4 + position];

            if is_input {
                reports[index].input = Some(handle);
            } else {
                reports[index].output = Some(handle);
            }
        }

        Ok(HidServer {
            adapter: radio.adapter().clone(),
            reports,
            protocol_mode: handles[0].1,
        })
    }

    /// The reports described by the registered report map
    pub fn reports(&self) -> impl Iterator<Item = ReportInfo> + '_ {
        self.reports.iter().map(|report| report.info)
    }

    /// Notify an input report to the subscribed hosts
    ///
    /// `report` carries the report body without the report id prefix and has to be exactly as
    /// long as the map describes.
    pub fn send_report(&self, report_id: u8, report: &[u8]) -> Result<(), Error> {
        let (info, handle) = self
            .reports
            .iter()
            .find(|bound| bound.info.report_id == report_id)
            .and_then(|bound| bound.input.map(|handle| (bound.info, handle)))
            .ok_or(Error::NoSuchCharacteristic(REPORT_UUID))?;

        if report.len() != info.input_len {
            return Err(Error::Value(ValueError::WrongSize {
                expected: info.input_len,
                actual: report.len(),
            }));
        }

        self.adapter.borrow_mut().write_local(handle, report)?;

        Ok(())
    }

    /// The last output report the host wrote, all zero until the host writes one
    pub fn output_report(&self, report_id: u8) -> Result<Vec<u8>, Error> {
        let handle = self
            .reports
            .iter()
            .find(|bound| bound.info.report_id == report_id)
            .and_then(|bound| bound.output)
            .ok_or(Error::NoSuchCharacteristic(REPORT_UUID))?;

        Ok(self.adapter.borrow().read_local(handle)?)
    }

    /// The active protocol mode, boot (0) or report (1)
    pub fn protocol_mode(&self) -> Result<u8, Error> {
        let value = self.adapter.borrow().read_local(self.protocol_mode)?;

        Ok(value.first().copied().unwrap_or(PROTOCOL_MODE_REPORT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_map_report_sizes() {
        let reports = parse_report_map(DEFAULT_REPORT_MAP).unwrap();

        assert_eq!(
            vec![
                ReportInfo { report_id: 1, input_len: 8, output_len: 1 },
                ReportInfo { report_id: 2, input_len: 4, output_len: 0 },
                ReportInfo { report_id: 3, input_len: 2, output_len: 0 },
            ],
            reports
        );
    }

    #[test]
    fn truncated_item_is_an_error() {
        // a two byte logical maximum cut short
        assert_eq!(
            Err(Error::InvalidReportMap("item data is truncated")),
            parse_report_map(&[0x26, 0x8C]).map(|_| ())
        );
    }

    #[test]
    fn long_items_are_rejected() {
        assert!(parse_report_map(&[0xFE, 0x02, 0x00, 0x00, 0x00]).is_err());
    }
}
