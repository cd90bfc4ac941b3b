//! USB HID keyboard device.
//!
//! Initialises the Embassy USB stack on the nRF52840 hardware USB
//! peripheral, exposes one keyboard endpoint, and implements the core's
//! [`Keyboard`] trait on top of it.

use core::sync::atomic::{AtomicBool, Ordering};

use defmt::{info, warn};
use delfin_panel::config;
use delfin_panel::hid::keyboard::{KEYBOARD_REPORT_DESCRIPTOR, KEYBOARD_REPORT_SIZE};
use delfin_panel::hid::{Key, Keyboard, KeyboardReport};
use embassy_nrf::usb::vbus_detect::HardwareVbusDetect;
use embassy_nrf::usb::Driver;
use embassy_nrf::{self, bind_interrupts, peripherals};
use embassy_usb::class::hid::{Config as HidConfig, HidWriter, State};
use embassy_usb::{Builder, Config, UsbDevice};
use static_cell::StaticCell;

bind_interrupts!(struct Irqs {
    USBD => embassy_nrf::usb::InterruptHandler<peripherals::USBD>;
    CLOCK_POWER => embassy_nrf::usb::vbus_detect::InterruptHandler;
});

pub type UsbDriver = Driver<'static, peripherals::USBD, HardwareVbusDetect>;

static KB_STATE: StaticCell<State> = StaticCell::new();
static USB_CONFIG_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_BOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_MSOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_CTRL_BUF: StaticCell<[u8; 128]> = StaticCell::new();
static USB_STATE_HANDLER: StaticCell<UsbStateHandler> = StaticCell::new();

/// Set while the host has the device configured and not suspended.
static HID_READY: AtomicBool = AtomicBool::new(false);

struct UsbStateHandler;

impl embassy_usb::Handler for UsbStateHandler {
    fn configured(&mut self, configured: bool) {
        HID_READY.store(configured, Ordering::Relaxed);
        info!("USB configured: {}", configured);
    }

    fn suspended(&mut self, suspended: bool) {
        HID_READY.store(!suspended, Ordering::Relaxed);
    }

    fn reset(&mut self) {
        HID_READY.store(false, Ordering::Relaxed);
    }
}

/// Build result: the USB device runner and the keyboard.
pub struct UsbHidDevice {
    pub device: UsbDevice<'static, UsbDriver>,
    pub keyboard: UsbKeyboard,
}

/// Initialise the USB stack and create the HID keyboard.
///
/// Must be called exactly once.  All static buffers are consumed here.
pub fn init(usbd: peripherals::USBD) -> UsbHidDevice {
    let driver = Driver::new(usbd, Irqs, HardwareVbusDetect::new(Irqs));

    let mut usb_config = Config::new(config::USB_VID, config::USB_PID);
    usb_config.manufacturer = Some(config::USB_MANUFACTURER);
    usb_config.product = Some(config::USB_PRODUCT);
    usb_config.serial_number = Some(config::USB_SERIAL_NUMBER);
    usb_config.max_power = 100; // mA
    usb_config.max_packet_size_0 = 64;

    let mut builder = Builder::new(
        driver,
        usb_config,
        USB_CONFIG_DESC.init([0u8; 256]),
        USB_BOS_DESC.init([0u8; 256]),
        USB_MSOS_DESC.init([0u8; 256]),
        USB_CTRL_BUF.init([0u8; 128]),
    );

    builder.handler(USB_STATE_HANDLER.init(UsbStateHandler));

    let kb_config = HidConfig {
        report_descriptor: KEYBOARD_REPORT_DESCRIPTOR,
        request_handler: None,
        poll_ms: config::USB_HID_POLL_MS,
        max_packet_size: 8,
    };
    let writer = HidWriter::new(&mut builder, KB_STATE.init(State::new()), kb_config);

    let device = builder.build();

    info!("USB HID keyboard initialised");

    UsbHidDevice {
        device,
        keyboard: UsbKeyboard {
            writer,
            report: KeyboardReport::empty(),
        },
    }
}

/// Run the USB device stack - must be spawned as a dedicated Embassy task.
pub async fn run_usb_device(mut device: UsbDevice<'static, UsbDriver>) -> ! {
    info!("USB device task started");
    device.run().await
}

/// Host keyboard over the USB HID endpoint.
pub struct UsbKeyboard {
    writer: HidWriter<'static, UsbDriver, 8>,
    /// Keys currently held.
    report: KeyboardReport,
}

impl UsbKeyboard {
    async fn send(&mut self, report: KeyboardReport) {
        let mut buf = [0u8; KEYBOARD_REPORT_SIZE];
        let n = report.serialize(&mut buf);
        if let Err(e) = self.writer.write(&buf[..n]).await {
            warn!("USB keyboard write failed: {:?}", e);
        }
    }
}

impl Keyboard for UsbKeyboard {
    async fn press(&mut self, key: Key) {
        if !self.report.press(key) {
            warn!("USB keyboard: cannot press {}", key);
            return;
        }
        self.send(self.report).await;
    }

    async fn release_all(&mut self) {
        self.report.release_all();
        self.send(self.report).await;
    }

    async fn type_string(&mut self, text: &str) {
        for c in text.chars() {
            let Some(report) = KeyboardReport::for_char(c) else {
                warn!("USB keyboard: no usage for {}", c);
                continue;
            };
            self.send(report).await;
            self.send(KeyboardReport::empty()).await;
        }
        self.report.release_all();
    }

    fn is_ready(&self) -> bool {
        HID_READY.load(Ordering::Relaxed)
    }
}
