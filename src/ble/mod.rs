//! Bluetooth Low Energy subsystem.
//!
//! Drives the Nordic SoftDevice S140 in **Peripheral** role:
//!
//! 1. **Advertiser** - connectable, scannable advertising with the label
//!    service UUID; the device name goes in the scan response.
//! 2. **GATT server** - see [`server`]; one central at a time.
//!
//! Every write and every connect/disconnect is posted to the main loop's
//! inbox as a [`LinkEvent`]. Nothing here touches device state directly.

pub mod server;

use defmt::{info, warn};
use delfin_panel::config::{BLE_DEVICE_NAME, LABEL_SERVICE_UUID_LE};
use delfin_panel::error::Error;
use delfin_panel::link::{post, Inbox, LinkEvent};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, Timer};
use nrf_softdevice::ble::advertisement_builder::{
    Flag, LegacyAdvertisementBuilder, LegacyAdvertisementPayload, ServiceList,
};
use nrf_softdevice::ble::{gatt_server, peripheral, Connection};
use nrf_softdevice::Softdevice;

use server::{LabelServiceEvent, Server, ServerEvent};

/// Back-off before retrying a failed advertising start.
const ADVERTISE_RETRY_MS: u64 = 500;

static ADV_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .flags(&[Flag::GeneralDiscovery, Flag::LE_Only])
    .services_128(ServiceList::Complete, &[LABEL_SERVICE_UUID_LE])
    .build();

static SCAN_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .full_name(BLE_DEVICE_NAME)
    .build();

/// Hand an event to the main loop, dropping it if the inbox is full.
fn forward(inbox: &Inbox<CriticalSectionRawMutex>, event: Option<LinkEvent>) {
    let Some(event) = event else {
        warn!("BLE: oversized write dropped");
        return;
    };
    if let Err(dropped) = post(inbox, event) {
        warn!("BLE: inbox full, dropped {}", dropped);
    }
}

/// Advertise until a central connects.
async fn advertise(sd: &'static Softdevice) -> Result<Connection, Error> {
    let config = peripheral::Config::default();
    let adv = peripheral::ConnectableAdvertisement::ScannableUndirected {
        adv_data: &ADV_DATA,
        scan_data: &SCAN_DATA,
    };
    peripheral::advertise_connectable(sd, adv, &config)
        .await
        .map_err(|e| {
            warn!("BLE: advertising failed: {:?}", e);
            Error::Advertise
        })
}

/// Advertise, serve one central until it leaves, repeat forever.
pub async fn run_link(
    sd: &'static Softdevice,
    server: &'static Server,
    inbox: &'static Inbox<CriticalSectionRawMutex>,
) -> ! {
    info!("BLE: advertising as '{}'", BLE_DEVICE_NAME);

    loop {
        let Ok(conn) = advertise(sd).await else {
            Timer::after(Duration::from_millis(ADVERTISE_RETRY_MS)).await;
            continue;
        };

        forward(inbox, Some(LinkEvent::Connected));

        let reason = gatt_server::run(&conn, server, |event| match event {
            ServerEvent::Label(event) => match event {
                LabelServiceEvent::ControlWrite(bytes) => {
                    forward(inbox, LinkEvent::control(&bytes));
                }
                LabelServiceEvent::ImageWrite(bytes) => {
                    forward(inbox, LinkEvent::payload(&bytes));
                }
                LabelServiceEvent::ControlCccdWrite { notifications } => {
                    info!("BLE: control notifications {}", notifications);
                }
            },
        })
        .await;

        info!("BLE: central disconnected: {:?}", reason);
        forward(inbox, Some(LinkEvent::Disconnected));
    }
}
