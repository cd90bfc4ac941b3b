//! GATT server: the label service with its control and image characteristics.

use delfin_panel::config::LINK_CHUNK_MAX;
use heapless::Vec;

/// Label service.
///
/// - `control` - JSON commands (`START_IMAGE`, `PRINT`)
/// - `image` - raw image chunks, in order
#[nrf_softdevice::gatt_service(uuid = "4fafc201-1fb5-459e-8fcc-c5c9c331914b")]
pub struct LabelService {
    #[characteristic(uuid = "beb5483e-36e1-4688-b7f5-ea07361b26a8", read, write, notify)]
    pub control: Vec<u8, LINK_CHUNK_MAX>,

    #[characteristic(
        uuid = "ae5946d7-1501-443b-8772-c06d649d5c4b",
        write,
        write_without_response
    )]
    pub image: Vec<u8, LINK_CHUNK_MAX>,
}

#[nrf_softdevice::gatt_server]
pub struct Server {
    pub label: LabelService,
}
