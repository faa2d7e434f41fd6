//! Facade tests against the in-memory adapter

mod common;

use common::MockAdapter;
use easy_ble::advertising::{Advertisement, AdvertisementKind};
use easy_ble::attribute::{Properties, Property};
use easy_ble::characteristic::ValueError;
use easy_ble::radio::BleRadio;
use easy_ble::scan::{ScanEntry, ScanParameters};
use easy_ble::services::{BatteryService, DeviceInfoService, LocalBatteryService, UartService};
use easy_ble::uuid::Uuid;
use easy_ble::{DeviceAddress, Error};
use std::collections::HashSet;
use std::time::Duration;

fn radio(adapter: &MockAdapter) -> BleRadio<MockAdapter> {
    BleRadio::new(adapter.clone()).unwrap()
}

fn report(adapter: &MockAdapter, address: [u8; 6], rssi: i8, data: Vec<u8>) {
    adapter.report(ScanEntry::new(
        DeviceAddress::public(address),
        rssi,
        true,
        false,
        data,
    ));
}

#[test]
fn scan_filters_by_kind_and_rssi() {
    let adapter = MockAdapter::new();

    // battery service advertiser, heard twice
    report(&adapter, [1, 0, 0, 0, 0, 0], -40, vec![0x03, 0x03, 0x0F, 0x18]);
    report(&adapter, [1, 0, 0, 0, 0, 0], -42, vec![0x03, 0x03, 0x0F, 0x18]);
    // same payload but too weak
    report(&adapter, [2, 0, 0, 0, 0, 0], -90, vec![0x03, 0x03, 0x0F, 0x18]);
    // strong enough but no service list
    report(&adapter, [3, 0, 0, 0, 0, 0], -40, vec![0x02, 0x01, 0x06]);

    let radio = radio(&adapter);

    let mut seen = HashSet::new();
    let mut yielded = 0;

    for entry in radio
        .start_scan(&[AdvertisementKind::ProvidesServices], ScanParameters::default())
        .unwrap()
    {
        assert!(entry.rssi() >= -80);

        seen.insert(entry.address());

        yielded += 1;
    }

    // both reports of the advertiser pass the filter, the set collapses them
    assert_eq!(2, yielded);
    assert_eq!(1, seen.len());
    assert!(seen.contains(&DeviceAddress::public([1, 0, 0, 0, 0, 0])));
}

#[test]
fn unrestricted_scan_yields_everything_strong_enough() {
    let adapter = MockAdapter::new();

    report(&adapter, [1, 0, 0, 0, 0, 0], -40, vec![0x02, 0x01, 0x06]);
    report(&adapter, [2, 0, 0, 0, 0, 0], -90, vec![0x02, 0x01, 0x06]);

    let radio = radio(&adapter);

    let entries: Vec<_> = radio
        .start_scan(&[AdvertisementKind::Any], ScanParameters::default())
        .unwrap()
        .collect();

    assert_eq!(1, entries.len());
}

#[test]
fn elapsed_timeout_ends_the_scan() {
    let adapter = MockAdapter::new();

    report(&adapter, [1, 0, 0, 0, 0, 0], -40, vec![0x02, 0x01, 0x06]);

    let radio = radio(&adapter);

    let parameters = ScanParameters {
        timeout: Some(Duration::ZERO),
        ..ScanParameters::default()
    };

    let mut results = radio.start_scan(&[AdvertisementKind::Any], parameters).unwrap();

    assert!(results.next().is_none());
}

#[test]
fn invalid_scan_parameters_are_rejected() {
    let adapter = MockAdapter::new();

    let radio = radio(&adapter);

    let parameters = ScanParameters {
        window: Duration::from_secs(1),
        interval: Duration::from_millis(100),
        ..ScanParameters::default()
    };

    assert!(matches!(
        radio.start_scan(&[AdvertisementKind::Any], parameters),
        Err(Error::InvalidScanParameters(_))
    ));
}

#[test]
fn small_payload_gets_the_default_scan_response() {
    let adapter = MockAdapter::new();

    let radio = radio(&adapter);

    radio.set_name("Thermometer").unwrap();

    let advertisement = Advertisement::provide_services(&[Uuid::from_u16(0x180F)]).unwrap();

    radio
        .start_advertising(&advertisement, None, &Default::default())
        .unwrap();

    let state = adapter.state();
    let state = state.borrow();

    assert!(state.advertising);

    let scan_response = Advertisement::from_entry(&ScanEntry::new(
        DeviceAddress::public([0; 6]),
        0,
        false,
        true,
        state.scan_response.clone().unwrap(),
    ));

    assert_eq!(Some("Thermometer"), scan_response.complete_name());
    assert_eq!(Some(0), scan_response.tx_power());
}

#[test]
fn oversized_payload_is_passed_through_without_scan_response() {
    let adapter = MockAdapter::new();

    let radio = radio(&adapter);

    let mut advertisement = Advertisement::new();

    advertisement.set_connectable(true).unwrap();
    advertisement
        .set_manufacturer_data(0x0059, &[0; 40])
        .unwrap();

    radio
        .start_advertising(&advertisement, None, &Default::default())
        .unwrap();

    let state = adapter.state();
    let state = state.borrow();

    assert!(state.scan_response.is_none());
    assert_eq!(44, state.advertised_data.as_ref().unwrap().len());
}

#[test]
fn device_information_reads_through_the_typed_client() {
    let adapter = MockAdapter::new();

    let address = DeviceAddress::public([9, 0, 0, 0, 0, 0]);
    let read_only: Properties = [Property::Read].into_iter().collect();

    adapter.add_peer_service(
        address,
        Uuid::from_u16(0x180A),
        &[
            (Uuid::from_u16(0x2A24), read_only, b"Feather".to_vec()),
            (Uuid::from_u16(0x2A29), read_only, b"Adafruit".to_vec()),
            (
                Uuid::from_u16(0x2A50),
                read_only,
                vec![0x02, 0x15, 0x19, 0x01, 0x00, 0x00, 0x01],
            ),
        ],
    );

    let radio = radio(&adapter);

    let connection = radio.connect_to(address, Duration::from_secs(1)).unwrap();

    assert_eq!(Ok(true), connection.has_service(Uuid::from_u16(0x180A)));

    let info: DeviceInfoService<_> = connection.service().unwrap();

    assert_eq!("Feather", info.model_number().unwrap());
    assert_eq!("Adafruit", info.manufacturer().unwrap());
    assert_eq!((0x02, 0x1915, 0x0001, 0x0100), info.pnp_id().unwrap());

    // a characteristic the peer did not expose
    assert_eq!(
        Err(Error::NoSuchCharacteristic(Uuid::from_u16(0x2A25))),
        info.serial_number()
    );
}

#[test]
fn missing_service_is_reported_by_uuid() {
    let adapter = MockAdapter::new();

    let address = DeviceAddress::public([9, 0, 0, 0, 0, 0]);

    adapter.add_peer_service(address, Uuid::from_u16(0x1800), &[]);

    let radio = radio(&adapter);

    let connection = radio.connect_to(address, Duration::from_secs(1)).unwrap();

    let result: Result<BatteryService<_>, _> = connection.service();

    assert!(matches!(result, Err(Error::NoSuchService(uuid)) if uuid == Uuid::from_u16(0x180F)));
}

#[test]
fn battery_level_out_of_range_is_an_error() {
    let adapter = MockAdapter::new();

    let address = DeviceAddress::public([9, 0, 0, 0, 0, 0]);
    let read_only: Properties = [Property::Read].into_iter().collect();

    let handles = adapter.add_peer_service(
        address,
        Uuid::from_u16(0x180F),
        &[(Uuid::from_u16(0x2A19), read_only, vec![87])],
    );

    let radio = radio(&adapter);

    let connection = radio.connect_to(address, Duration::from_secs(1)).unwrap();

    let battery: BatteryService<_> = connection.service().unwrap();

    assert_eq!(87, battery.level().unwrap());

    // the peer starts reporting nonsense
    adapter
        .state()
        .borrow_mut()
        .peers
        .get_mut(&address)
        .unwrap()
        .values
        .insert(handles[0], vec![150]);

    assert_eq!(Err(Error::Value(ValueError::OutOfRange)), battery.level());
}

#[test]
fn local_battery_service_validates_the_level() {
    let adapter = MockAdapter::new();

    let radio = radio(&adapter);

    let battery = LocalBatteryService::register(&radio, 90).unwrap();

    assert_eq!(Ok(90), battery.level());

    battery.set_level(35).unwrap();

    assert_eq!(Ok(35), battery.level());

    assert_eq!(Err(Error::Value(ValueError::OutOfRange)), battery.set_level(101));
    assert_eq!(Ok(35), battery.level());
}

#[test]
fn uart_echo_round_trip() {
    let adapter = MockAdapter::new();

    let address = DeviceAddress::public([7, 0, 0, 0, 0, 0]);

    let writable: Properties = [Property::Write, Property::WriteWithoutResponse]
        .into_iter()
        .collect();
    let notifying: Properties = [Property::Notify].into_iter().collect();

    let nus = Uuid::from_u128(0x6E400001_B5A3_F393_E0A9_E50E24DCCA9E);
    let rx = Uuid::from_u128(0x6E400002_B5A3_F393_E0A9_E50E24DCCA9E);
    let tx = Uuid::from_u128(0x6E400003_B5A3_F393_E0A9_E50E24DCCA9E);

    let handles = adapter.add_peer_service(
        address,
        nus,
        &[(rx, writable, Vec::new()), (tx, notifying, Vec::new())],
    );

    adapter.echo(address, handles[0], handles[1]);

    let radio = radio(&adapter);

    let connection = radio.connect_to(address, Duration::from_secs(1)).unwrap();

    let uart: UartService<_> = connection.service().unwrap();

    // binding subscribed to the peripheral's TX characteristic
    assert!(adapter
        .state()
        .borrow()
        .subscriptions
        .iter()
        .any(|(_, handle, enable)| *handle == handles[1] && *enable));

    uart.write(b"ping\npong").unwrap();

    assert_eq!(Some(b"ping\n".to_vec()), uart.readline().unwrap());
    assert_eq!(4, uart.in_waiting().unwrap());

    let mut buffer = [0u8; 8];

    assert_eq!(4, uart.read(&mut buffer).unwrap());
    assert_eq!(b"pong", &buffer[..4]);

    // nothing left, a short timeout read comes back empty
    uart.set_timeout(Duration::from_millis(5));

    assert_eq!(0, uart.read(&mut buffer).unwrap());
}

#[test]
fn uart_write_is_chunked() {
    let adapter = MockAdapter::new();

    let address = DeviceAddress::public([7, 0, 0, 0, 0, 0]);

    let writable: Properties = [Property::Write].into_iter().collect();
    let notifying: Properties = [Property::Notify].into_iter().collect();

    let nus = Uuid::from_u128(0x6E400001_B5A3_F393_E0A9_E50E24DCCA9E);
    let rx = Uuid::from_u128(0x6E400002_B5A3_F393_E0A9_E50E24DCCA9E);
    let tx = Uuid::from_u128(0x6E400003_B5A3_F393_E0A9_E50E24DCCA9E);

    let handles = adapter.add_peer_service(
        address,
        nus,
        &[(rx, writable, Vec::new()), (tx, notifying, Vec::new())],
    );

    adapter.echo(address, handles[0], handles[1]);

    let radio = radio(&adapter);

    let connection = radio.connect_to(address, Duration::from_secs(1)).unwrap();

    let uart: UartService<_> = connection.service().unwrap();

    let message = vec![0x55u8; 50];

    uart.write(&message).unwrap();

    // every byte arrives despite the 20 byte chunking
    let mut buffer = vec![0u8; 64];

    uart.read_exact(&mut buffer[..50]).unwrap();

    assert_eq!(message, buffer[..50]);
}

#[test]
fn dropped_links_are_pruned() {
    let adapter = MockAdapter::new();

    let address = DeviceAddress::public([9, 0, 0, 0, 0, 0]);

    adapter.add_peer_service(address, Uuid::from_u16(0x180F), &[]);

    let radio = radio(&adapter);

    let connection = radio.connect_to(address, Duration::from_secs(1)).unwrap();

    assert!(radio.connected());
    assert_eq!(1, radio.connections().len());

    adapter.drop_connection(connection.handle());

    assert!(!connection.connected());
    assert!(!radio.connected());
    assert!(radio.connections().is_empty());

    assert_eq!(
        Err(Error::NotConnected),
        connection.has_service(Uuid::from_u16(0x180F))
    );
}

#[test]
fn registered_device_information_is_fixed_and_read_only() {
    use easy_ble::services::DeviceInfo;

    let adapter = MockAdapter::new();

    let radio = radio(&adapter);

    DeviceInfo {
        model_number: Some(String::from("Feather nRF52840")),
        manufacturer: Some(String::from("Adafruit Industries")),
        ..DeviceInfo::default()
    }
    .register(&radio)
    .unwrap();

    let state = adapter.state();
    let state = state.borrow();

    let service = &state.local_services[0];

    assert_eq!(Uuid::from_u16(0x180A), service.uuid);
    assert_eq!(2, service.characteristics.len());

    for characteristic in &service.characteristics {
        assert!(characteristic.properties().contains(Property::Read));
        assert!(!characteristic.properties().contains(Property::Write));
        assert!(characteristic.is_fixed_length());
    }

    let (_, model_handle) = state
        .local_registrations
        .iter()
        .find(|(uuid, _)| *uuid == Uuid::from_u16(0x2A24))
        .unwrap();

    assert_eq!(
        b"Feather nRF52840".as_slice(),
        state.local_values[model_handle]
    );
}

#[test]
fn uart_server_reads_per_connection_and_notifies_writes() {
    use easy_ble::services::UartServer;

    let adapter = MockAdapter::new();

    let radio = radio(&adapter);

    let server = UartServer::register(&radio).unwrap();

    // a central connects; the mock needs a known peer for that
    let central = DeviceAddress::random([8, 0, 0, 0, 0, 0]);

    adapter.add_peer_service(central, Uuid::from_u16(0x1801), &[]);

    let connection = radio.connect_to(central, Duration::from_secs(1)).unwrap();

    let nus_rx = Uuid::from_u128(0x6E400002_B5A3_F393_E0A9_E50E24DCCA9E);
    let nus_tx = Uuid::from_u128(0x6E400003_B5A3_F393_E0A9_E50E24DCCA9E);

    let find = |uuid: Uuid| {
        adapter
            .state()
            .borrow()
            .local_registrations
            .iter()
            .find(|(u, _)| *u == uuid)
            .map(|(_, handle)| *handle)
            .unwrap()
    };

    adapter.inject_buffered(connection.handle(), find(nus_rx), b"hello\nwor");

    assert_eq!(Some(b"hello\n".to_vec()), server.readline(&connection).unwrap());
    assert_eq!(3, server.in_waiting(&connection).unwrap());

    server.set_timeout(Duration::from_millis(5));

    // the rest of the line has not arrived yet
    assert_eq!(None, server.readline(&connection).unwrap());

    server.write(b"ok").unwrap();

    assert_eq!(
        b"ok".as_slice(),
        adapter.state().borrow().local_values[&find(nus_tx)]
    );
}

#[test]
fn hid_server_publishes_the_reports_of_the_map() {
    use easy_ble::services::hid::DEFAULT_REPORT_MAP;
    use easy_ble::services::{HidServer, ReportInfo};

    let adapter = MockAdapter::new();

    let radio = radio(&adapter);

    let server = HidServer::register(&radio).unwrap();

    let reports: Vec<ReportInfo> = server.reports().collect();

    assert_eq!(3, reports.len());
    assert_eq!(
        ReportInfo { report_id: 1, input_len: 8, output_len: 1 },
        reports[0]
    );

    assert_eq!(1, server.protocol_mode().unwrap());

    // keyboard report with one key down
    server.send_report(1, &[0, 0, 0x04, 0, 0, 0, 0, 0]).unwrap();

    assert_eq!(
        Err(Error::Value(ValueError::WrongSize { expected: 8, actual: 2 })),
        server.send_report(1, &[0; 2])
    );

    // no output report is described for the mouse
    assert!(server.output_report(2).is_err());
    assert_eq!(vec![0u8], server.output_report(1).unwrap());

    let state = adapter.state();
    let state = state.borrow();

    let service = &state.local_services[0];

    assert_eq!(Uuid::from_u16(0x1812), service.uuid);

    let (_, map_handle) = state
        .local_registrations
        .iter()
        .find(|(uuid, _)| *uuid == Uuid::from_u16(0x2A4B))
        .unwrap();

    assert_eq!(DEFAULT_REPORT_MAP, state.local_values[map_handle].as_slice());

    // the keyboard input report is the first notifying characteristic and carries its
    // report reference descriptor
    let index = service
        .characteristics
        .iter()
        .position(|characteristic| characteristic.properties().contains(Property::Notify))
        .unwrap();

    let keyboard_in = &service.characteristics[index];

    assert_eq!(Uuid::from_u16(0x2A4D), keyboard_in.uuid());
    assert_eq!(&[1, 1], keyboard_in.descriptors()[0].value());

    let (_, input_handle) = state.local_registrations[index];

    assert_eq!(
        vec![0u8, 0, 0x04, 0, 0, 0, 0, 0],
        state.local_values[&input_handle]
    );
}

#[test]
fn address_set_membership_is_idempotent() {
    use rand::{Rng, SeedableRng};

    let mut rng = rand::rngs::StdRng::seed_from_u64(0x1209);

    let addresses: Vec<[u8; 6]> = (0..64).map(|_| rng.gen()).collect();

    let mut seen = HashSet::new();

    // every address twice, the set keeps one of each
    for bytes in addresses.iter().chain(addresses.iter()) {
        seen.insert(DeviceAddress::public(*bytes));
    }

    let unique: HashSet<_> = addresses.iter().collect();

    assert_eq!(unique.len(), seen.len());
}

#[test]
fn connecting_by_scanned_advertisement() {
    let adapter = MockAdapter::new();

    let address = DeviceAddress::public([5, 0, 0, 0, 0, 0]);

    adapter.add_peer_service(address, Uuid::from_u16(0x180F), &[]);

    report(&adapter, [5, 0, 0, 0, 0, 0], -40, vec![0x03, 0x03, 0x0F, 0x18]);

    let radio = radio(&adapter);

    let entry = radio
        .start_scan(&[AdvertisementKind::ProvidesServices], ScanParameters::default())
        .unwrap()
        .next()
        .unwrap();

    let advertisement = Advertisement::from_entry(&entry);

    assert!(advertisement.provides_service(Uuid::from_u16(0x180F)));

    let connection = radio.connect(&advertisement, Duration::from_secs(1)).unwrap();

    assert!(connection.connected());

    // a locally built advertisement has no one to connect to
    assert_eq!(
        Err(Error::PeerAddressUnknown),
        radio
            .connect(&Advertisement::new(), Duration::from_secs(1))
            .map(|_| ())
    );
}
