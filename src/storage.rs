//! Persistent storage for the custom macro scripts.
//!
//! Uses the nRF52840's internal flash via the `sequential-storage` crate.
//! Each script is one map item keyed by [`ScriptId::key`]; the text is
//! stored as raw UTF-8 bytes.
//!
//! On first boot (no item for a key) the built-in default from
//! `payloads/` is written so later boots read it back from flash.

use defmt::{error, info, warn};
use delfin_panel::config::{SCRIPT_MAX_BYTES, STORAGE_FLASH_PAGE_COUNT, STORAGE_FLASH_PAGE_START};
use delfin_panel::error::Error;
use delfin_panel::macros::script::{ScriptId, ScriptSource};
use embedded_storage_async::nor_flash::NorFlash;
use heapless::String;
use sequential_storage::cache::NoCache;
use sequential_storage::map::{fetch_item, store_item};

/// Flash page size for nRF52840 (4 KB).
const FLASH_PAGE_SIZE: u32 = 4096;

/// Start address of our storage region.
const STORAGE_START: u32 = STORAGE_FLASH_PAGE_START * FLASH_PAGE_SIZE;

/// End address (exclusive) of our storage region.
const STORAGE_END: u32 = (STORAGE_FLASH_PAGE_START + STORAGE_FLASH_PAGE_COUNT) * FLASH_PAGE_SIZE;

/// Scratch space for one item: key, length header and value.
const ITEM_BUF_SIZE: usize = SCRIPT_MAX_BYTES + 32;

const DEFAULT_CUSTOM1: &str = include_str!("../payloads/custom1.txt");
const DEFAULT_CUSTOM2: &str = include_str!("../payloads/custom2.txt");

type Script = String<SCRIPT_MAX_BYTES>;

/// In-memory copy of the stored scripts.
pub struct ScriptStore {
    custom1: Option<Script>,
    custom2: Option<Script>,
}

impl ScriptStore {
    /// Create an empty store.
    pub const fn new() -> Self {
        Self {
            custom1: None,
            custom2: None,
        }
    }

    /// Load every script from flash, seeding missing ones with the
    /// built-in defaults.
    ///
    /// A script that cannot be read stays empty and its macro does
    /// nothing; the others still load.
    pub async fn load_from_flash(&mut self, flash: &mut impl NorFlash) -> Result<(), Error> {
        let mut result = Ok(());
        for id in ScriptId::ALL {
            match load_one(flash, id).await {
                Ok(script) => *self.slot(id) = Some(script),
                Err(e) => {
                    *self.slot(id) = None;
                    result = Err(e);
                }
            }
        }
        result
    }

    fn slot(&mut self, id: ScriptId) -> &mut Option<Script> {
        match id {
            ScriptId::Custom1 => &mut self.custom1,
            ScriptId::Custom2 => &mut self.custom2,
        }
    }
}

impl ScriptSource for ScriptStore {
    fn script(&self, id: ScriptId) -> Option<&str> {
        let slot = match id {
            ScriptId::Custom1 => &self.custom1,
            ScriptId::Custom2 => &self.custom2,
        };
        slot.as_ref().map(|s| s.as_str())
    }
}

fn default_script(id: ScriptId) -> &'static str {
    match id {
        ScriptId::Custom1 => DEFAULT_CUSTOM1,
        ScriptId::Custom2 => DEFAULT_CUSTOM2,
    }
}

async fn load_one(flash: &mut impl NorFlash, id: ScriptId) -> Result<Script, Error> {
    let flash_range = STORAGE_START..STORAGE_END;
    let mut buf = [0u8; ITEM_BUF_SIZE];

    match fetch_item::<u8, &[u8], _>(
        flash,
        flash_range.clone(),
        &mut NoCache::new(),
        &mut buf,
        &id.key(),
    )
    .await
    {
        Ok(Some(data)) => match core::str::from_utf8(data).ok().and_then(|s| String::try_from(s).ok()) {
            Some(script) => {
                info!("Script {}: {} bytes from flash", id, script.len());
                return Ok(script);
            }
            None => warn!("Script {}: stored bytes unusable, reseeding", id),
        },
        Ok(None) => info!("Script {}: not in flash, seeding {}", id, id.path()),
        Err(e) => {
            error!("Flash read error: {:?}", defmt::Debug2Format(&e));
            return Err(Error::Storage);
        }
    }

    let text = default_script(id);
    let script = Script::try_from(text).map_err(|_| {
        error!("Script {}: default exceeds {} bytes", id, SCRIPT_MAX_BYTES);
        Error::Storage
    })?;

    if let Err(e) = store_item::<u8, &[u8], _>(
        flash,
        flash_range,
        &mut NoCache::new(),
        &mut buf,
        &id.key(),
        &text.as_bytes(),
    )
    .await
    {
        // Keep the default in RAM; the next boot tries again.
        error!("Flash write error: {:?}", defmt::Debug2Format(&e));
    }

    Ok(script)
}
