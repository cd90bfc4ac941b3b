//! delfin-panel - BLE label receiver and USB HID macro pad for the nRF52840.
//!
//! ## Tasks
//!
//! | Task              | Role                                              |
//! |-------------------|---------------------------------------------------|
//! | `softdevice_task` | SoftDevice event pump                             |
//! | `link_task`       | advertise, serve GATT writes, post to the inbox   |
//! | `usb_task`        | USB enumeration and endpoint servicing            |
//! | `button_task` ×3  | debounced UP / DOWN / SELECT                      |
//! | `main`            | the device core: inbox → mode machine → UI        |
//!
//! All device state lives in the single `DeviceCore` owned by `main`.

#![no_std]
#![no_main]

extern crate alloc;

mod ble;
mod storage;
mod usb;

/// Board-side UI: the OLED panel and the GPIO buttons.
mod ui {
    pub mod buttons;
    pub mod display;
}

use defmt::{debug, info, unwrap, warn};
use delfin_panel::config::{HEAP_SIZE, MAIN_LOOP_PERIOD_MS};
use delfin_panel::device::{ButtonOutcome, DeviceCore, Host, LinkOutcome};
use delfin_panel::error::Error;
use delfin_panel::link::payload::TransferStatus;
use delfin_panel::link::Inbox;
use delfin_panel::mode::ModeTimings;
use delfin_panel::transfer::TransferBuffer;
use delfin_panel::ui::ButtonEvent;
use embassy_executor::Spawner;
use embassy_nrf::gpio::{AnyPin, Pin};
use embassy_nrf::interrupt::{self, InterruptExt, Priority};
use embassy_nrf::twim::{self, Twim};
use embassy_nrf::{bind_interrupts, peripherals};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Delay, Instant, Timer};
use embassy_usb::UsbDevice;
use embedded_alloc::LlffHeap as Heap;
use nrf_softdevice::{raw, Flash, Softdevice};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use crate::ble::server::Server;
use crate::storage::ScriptStore;
use crate::ui::buttons::BUTTON_QUEUE_DEPTH;
use crate::usb::hid_device::UsbDriver;

// Heap for the received image buffer.
#[global_allocator]
static HEAP: Heap = Heap::empty();

bind_interrupts!(struct Irqs {
    SPIM0_SPIS0_TWIM0_TWIS0_SPI0_TWI0 => twim::InterruptHandler<peripherals::TWISPI0>;
});

/// Link task → main loop.
static INBOX: Inbox<CriticalSectionRawMutex> = Channel::new();

/// Button tasks → main loop.
static BUTTONS: Channel<CriticalSectionRawMutex, ButtonEvent, BUTTON_QUEUE_DEPTH> =
    Channel::new();

static SERVER: StaticCell<Server> = StaticCell::new();

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

#[embassy_executor::task]
async fn link_task(sd: &'static Softdevice, server: &'static Server) -> ! {
    ble::run_link(sd, server, &INBOX).await
}

#[embassy_executor::task]
async fn usb_task(device: UsbDevice<'static, UsbDriver>) -> ! {
    usb::hid_device::run_usb_device(device).await
}

#[embassy_executor::task(pool_size = 3)]
async fn button_task(pin: AnyPin, event: ButtonEvent) -> ! {
    ui::buttons::button_task(pin, event, BUTTONS.sender()).await
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("delfin-panel starting...");

    init_heap();

    // The SoftDevice reserves priorities 0, 1 and 4.
    let mut nrf_config = embassy_nrf::config::Config::default();
    nrf_config.gpiote_interrupt_priority = Priority::P2;
    nrf_config.time_interrupt_priority = Priority::P2;
    let p = embassy_nrf::init(nrf_config);
    interrupt::USBD.set_priority(Priority::P2);
    interrupt::CLOCK_POWER.set_priority(Priority::P2);
    interrupt::SPIM0_SPIS0_TWIM0_TWIS0_SPI0_TWI0.set_priority(Priority::P3);

    let sd = Softdevice::enable(&softdevice_config());
    let server = SERVER.init(unwrap!(Server::new(sd).map_err(|_| Error::GattRegister)));
    let sd: &'static Softdevice = sd;
    unwrap!(spawner.spawn(softdevice_task(sd)));

    // Script store must be read before BLE traffic starts using the radio.
    let mut scripts = ScriptStore::new();
    let mut flash = Flash::take(sd);
    let scripts_loaded = match scripts.load_from_flash(&mut flash).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Scripts unavailable: {}", e);
            false
        }
    };

    let usb = usb::hid_device::init(p.USBD);
    unwrap!(spawner.spawn(usb_task(usb.device)));
    unwrap!(spawner.spawn(link_task(sd, server)));

    unwrap!(spawner.spawn(button_task(p.P0_11.degrade(), ButtonEvent::Up)));
    unwrap!(spawner.spawn(button_task(p.P0_12.degrade(), ButtonEvent::Down)));
    unwrap!(spawner.spawn(button_task(p.P0_24.degrade(), ButtonEvent::Select)));

    let i2c = Twim::new(
        p.TWISPI0,
        Irqs,
        p.P0_26,
        p.P0_27,
        twim::Config::default(),
    );
    let panel = ui::display::OledPanel::new(ui::display::init(i2c));

    let mut host = Host {
        keyboard: usb.keyboard,
        delay: Delay,
        panel,
        scripts,
    };
    let mut core = DeviceCore::new(TransferBuffer::new(), ModeTimings::default());
    core.announce_boot(&mut host.panel, scripts_loaded);

    info!("All tasks spawned, entering main loop");

    loop {
        core.drain_inbox(&INBOX, log_link_outcome);

        let now = Instant::now().as_millis();
        if let Some(t) = core.tick(now, &mut host).await {
            info!("Mode: {} -> {}", t.from, t.to);
        }

        if let Some(line) = core.poll_diagnostics(now, HEAP.free(), &mut host) {
            info!("{}", line.as_str());
        }

        while let Ok(event) = BUTTONS.try_receive() {
            match core.on_button(event, &mut host).await {
                ButtonOutcome::Moved(_) => host.panel.set_menu(*core.menu()),
                ButtonOutcome::Ran(id) => info!("Macro {} done", id),
                ButtonOutcome::Busy => debug!("Button ignored: label sequence running"),
            }
        }

        Timer::after_millis(MAIN_LOOP_PERIOD_MS).await;
    }
}

fn log_link_outcome(outcome: LinkOutcome) {
    match outcome {
        LinkOutcome::Connected { connections } => {
            info!("BLE: central connected (#{})", connections)
        }
        LinkOutcome::Disconnected { resume_advertising } => {
            info!("BLE: central gone, advertising again: {}", resume_advertising)
        }
        LinkOutcome::Control(Ok(message)) => info!("Control: {}", message),
        LinkOutcome::Control(Err(e)) => warn!("Control rejected: {}", e),
        LinkOutcome::Payload {
            status: TransferStatus::Rejected(e),
            ..
        } => warn!("Chunk ignored: {}", e),
        LinkOutcome::Payload {
            status,
            loaded,
            capacity,
            milestone,
        } => {
            if let Some(pct) = milestone {
                info!("Image progress: {}/{} ({}%)", loaded, capacity, pct);
            }
            if status == TransferStatus::Completed {
                info!("Image fully received ({} bytes)", capacity);
            }
        }
    }
}

/// Initialize the heap allocator
fn init_heap() {
    use core::mem::MaybeUninit;
    static mut HEAP_MEM: [MaybeUninit<u8>; HEAP_SIZE] = [MaybeUninit::uninit(); HEAP_SIZE];
    #[allow(static_mut_refs)]
    unsafe {
        HEAP.init(HEAP_MEM.as_ptr() as usize, HEAP_SIZE)
    }
}

/// SoftDevice configuration: one peripheral link with a large ATT MTU so
/// each image chunk fits one write.
fn softdevice_config() -> nrf_softdevice::Config {
    nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: 247 }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
            central_role_count: 0,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: delfin_panel::config::BLE_DEVICE_NAME.as_ptr() as _,
            current_len: delfin_panel::config::BLE_DEVICE_NAME.len() as u16,
            max_len: delfin_panel::config::BLE_DEVICE_NAME.len() as u16,
            write_perm: unsafe { core::mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    }
}
