//! Macro table and dispatch.
//!
//! Every menu entry maps to a [`MacroAction`] through the static [`MACROS`]
//! table. Executing a macro drives the host keyboard directly and blocks the
//! main loop until the last key is released.

pub mod script;

use embedded_hal_async::delay::DelayNs;

use crate::config::{
    PRINT_COMBO_HOLD_MS, RUN_DIALOG_OPEN_MS, RUN_DIALOG_TYPE_MS, START_MENU_SEARCH_MS,
};
use crate::error::DispatchError;
use crate::hid::{tap_combo, Key, Keyboard};
use script::{ScriptId, ScriptSource};

/// What a macro does on the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MacroAction {
    /// Run dialog → `cmd`.
    OpenTerminal(&'static str),
    /// Alt+P, held briefly.
    SendPrintCombo,
    /// Run dialog → `powershell`.
    OpenShell(&'static str),
    /// Run dialog → `notepad`.
    OpenEditor(&'static str),
    /// GUI+L.
    LockSession,
    /// Ctrl+Shift+Esc.
    OpenTaskManager,
    /// Interpret a stored script.
    RunStoredScript(ScriptId),
    /// Press the keys in order, then release.
    KeyCombo(&'static [Key]),
    /// Run dialog → URL.
    OpenBrowser(&'static str),
    /// Start menu search → IDE launcher.
    OpenEditorIde(&'static str),
}

/// One menu entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MacroEntry {
    /// Short label shown in the menu and as status while running.
    pub label: &'static str,
    pub action: MacroAction,
}

/// Action id of the print shortcut entry.
pub const PRINT_LABEL_ID: u8 = 0;

/// Macro table, indexed by action id.
pub static MACROS: [MacroEntry; 12] = [
    MacroEntry {
        label: "Printing Label",
        action: MacroAction::SendPrintCombo,
    },
    MacroEntry {
        label: "CMD",
        action: MacroAction::OpenTerminal("cmd"),
    },
    MacroEntry {
        label: "PowerShell",
        action: MacroAction::OpenShell("powershell"),
    },
    MacroEntry {
        label: "Notepad",
        action: MacroAction::OpenEditor("notepad"),
    },
    MacroEntry {
        label: "Task Mgr",
        action: MacroAction::OpenTaskManager,
    },
    MacroEntry {
        label: "Locking PC",
        action: MacroAction::LockSession,
    },
    MacroEntry {
        label: "Custom 1",
        action: MacroAction::RunStoredScript(ScriptId::Custom1),
    },
    MacroEntry {
        label: "Custom 2",
        action: MacroAction::RunStoredScript(ScriptId::Custom2),
    },
    MacroEntry {
        label: "Win+R",
        action: MacroAction::KeyCombo(&[Key::LeftGui, Key::Char('r')]),
    },
    MacroEntry {
        label: "Screenshot",
        action: MacroAction::KeyCombo(&[Key::LeftGui, Key::PrintScreen]),
    },
    MacroEntry {
        label: "Browser",
        action: MacroAction::OpenBrowser("https://google.com"),
    },
    MacroEntry {
        label: "VS Code",
        action: MacroAction::OpenEditorIde("code"),
    },
];

/// Table lookup and execution of macros.
pub struct MacroDispatch;

impl MacroDispatch {
    /// Resolve an action id.
    pub fn lookup(id: u8) -> Result<&'static MacroEntry, DispatchError> {
        MACROS
            .get(usize::from(id))
            .ok_or(DispatchError::Unmapped(id))
    }

    /// Look up `id` and run it. Unknown ids are a no-op and still succeed.
    pub async fn dispatch<K, D, S>(
        id: u8,
        keyboard: &mut K,
        delay: &mut D,
        scripts: &S,
    ) -> Result<(), DispatchError>
    where
        K: Keyboard,
        D: DelayNs,
        S: ScriptSource,
    {
        if let Ok(entry) = Self::lookup(id) {
            execute(entry.action, keyboard, delay, scripts).await;
        }
        Ok(())
    }
}

/// Run one action against the host keyboard.
pub async fn execute<K, D, S>(action: MacroAction, keyboard: &mut K, delay: &mut D, scripts: &S)
where
    K: Keyboard,
    D: DelayNs,
    S: ScriptSource,
{
    match action {
        MacroAction::SendPrintCombo => send_print_combo(keyboard, delay).await,
        MacroAction::OpenTerminal(cmd)
        | MacroAction::OpenShell(cmd)
        | MacroAction::OpenEditor(cmd)
        | MacroAction::OpenBrowser(cmd) => run_dialog(keyboard, delay, cmd).await,
        MacroAction::LockSession => tap_combo(keyboard, &[Key::LeftGui, Key::Char('l')]).await,
        MacroAction::OpenTaskManager => {
            tap_combo(keyboard, &[Key::LeftCtrl, Key::LeftShift, Key::Escape]).await
        }
        MacroAction::RunStoredScript(id) => {
            if let Some(text) = scripts.script(id) {
                script::run(text, keyboard, delay).await;
            }
        }
        MacroAction::KeyCombo(keys) => tap_combo(keyboard, keys).await,
        MacroAction::OpenEditorIde(name) => start_menu_launch(keyboard, delay, name).await,
    }
}

/// Alt+P with a short hold so the host registers the chord.
pub async fn send_print_combo<K: Keyboard, D: DelayNs>(keyboard: &mut K, delay: &mut D) {
    keyboard.press(Key::LeftAlt).await;
    keyboard.press(Key::Char('p')).await;
    delay.delay_ms(PRINT_COMBO_HOLD_MS).await;
    keyboard.release_all().await;
}

/// GUI+R, type `command`, Enter.
async fn run_dialog<K: Keyboard, D: DelayNs>(keyboard: &mut K, delay: &mut D, command: &str) {
    tap_combo(keyboard, &[Key::LeftGui, Key::Char('r')]).await;
    delay.delay_ms(RUN_DIALOG_OPEN_MS).await;
    keyboard.type_string(command).await;
    delay.delay_ms(RUN_DIALOG_TYPE_MS).await;
    tap_combo(keyboard, &[Key::Enter]).await;
}

/// Tap GUI to open the start menu, search for `name`, Enter.
async fn start_menu_launch<K: Keyboard, D: DelayNs>(keyboard: &mut K, delay: &mut D, name: &str) {
    tap_combo(keyboard, &[Key::LeftGui]).await;
    keyboard.type_string(name).await;
    delay.delay_ms(START_MENU_SEARCH_MS).await;
    tap_combo(keyboard, &[Key::Enter]).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixedScripts, KeyCall, RecordingDelay, RecordingKeyboard};
    use embassy_futures::block_on;
    use script::NoScripts;

    fn dispatch(id: u8, scripts: &impl ScriptSource) -> (RecordingKeyboard, RecordingDelay) {
        let mut kb = RecordingKeyboard::default();
        let mut delay = RecordingDelay::default();
        block_on(MacroDispatch::dispatch(id, &mut kb, &mut delay, scripts)).unwrap();
        (kb, delay)
    }

    #[test]
    fn unknown_id_is_a_silent_success() {
        for id in [12, 99, u8::MAX] {
            let (kb, delay) = dispatch(id, &NoScripts);
            assert!(kb.calls.is_empty());
            assert!(delay.waits_ms.is_empty());
        }
        assert_eq!(MacroDispatch::lookup(12), Err(DispatchError::Unmapped(12)));
    }

    #[test]
    fn every_table_slot_resolves() {
        for id in 0..MACROS.len() as u8 {
            assert!(MacroDispatch::lookup(id).is_ok());
        }
        assert_eq!(
            MacroDispatch::lookup(PRINT_LABEL_ID).unwrap().action,
            MacroAction::SendPrintCombo
        );
    }

    #[test]
    fn print_combo_holds_alt_p() {
        let (kb, delay) = dispatch(PRINT_LABEL_ID, &NoScripts);
        assert_eq!(
            kb.calls.as_slice(),
            &[
                KeyCall::Press(Key::LeftAlt),
                KeyCall::Press(Key::Char('p')),
                KeyCall::ReleaseAll,
            ]
        );
        assert_eq!(delay.waits_ms.as_slice(), &[PRINT_COMBO_HOLD_MS]);
    }

    #[test]
    fn terminal_goes_through_the_run_dialog() {
        let (kb, delay) = dispatch(1, &NoScripts);
        assert_eq!(
            kb.calls.as_slice(),
            &[
                KeyCall::Press(Key::LeftGui),
                KeyCall::Press(Key::Char('r')),
                KeyCall::ReleaseAll,
                KeyCall::Type("cmd".into()),
                KeyCall::Press(Key::Enter),
                KeyCall::ReleaseAll,
            ]
        );
        assert_eq!(delay.waits_ms.as_slice(), &[400, 100]);
    }

    #[test]
    fn run_dialog_literals() {
        for (id, text) in [(2, "powershell"), (3, "notepad"), (10, "https://google.com")] {
            let (kb, _) = dispatch(id, &NoScripts);
            assert_eq!(kb.typed(), [text]);
        }
    }

    #[test]
    fn task_manager_and_lock() {
        let (kb, _) = dispatch(4, &NoScripts);
        assert_eq!(
            kb.calls.as_slice(),
            &[
                KeyCall::Press(Key::LeftCtrl),
                KeyCall::Press(Key::LeftShift),
                KeyCall::Press(Key::Escape),
                KeyCall::ReleaseAll,
            ]
        );

        let (kb, delay) = dispatch(5, &NoScripts);
        assert_eq!(
            kb.calls.as_slice(),
            &[
                KeyCall::Press(Key::LeftGui),
                KeyCall::Press(Key::Char('l')),
                KeyCall::ReleaseAll,
            ]
        );
        assert!(delay.waits_ms.is_empty());
    }

    #[test]
    fn raw_combos() {
        let (kb, _) = dispatch(9, &NoScripts);
        assert_eq!(
            kb.calls.as_slice(),
            &[
                KeyCall::Press(Key::LeftGui),
                KeyCall::Press(Key::PrintScreen),
                KeyCall::ReleaseAll,
            ]
        );
    }

    #[test]
    fn ide_is_launched_from_the_start_menu() {
        let (kb, delay) = dispatch(11, &NoScripts);
        assert_eq!(
            kb.calls.as_slice(),
            &[
                KeyCall::Press(Key::LeftGui),
                KeyCall::ReleaseAll,
                KeyCall::Type("code".into()),
                KeyCall::Press(Key::Enter),
                KeyCall::ReleaseAll,
            ]
        );
        assert_eq!(delay.waits_ms.as_slice(), &[START_MENU_SEARCH_MS]);
    }

    #[test]
    fn missing_script_is_a_no_op() {
        let (kb, delay) = dispatch(6, &NoScripts);
        assert!(kb.calls.is_empty());
        assert!(delay.waits_ms.is_empty());
    }

    #[test]
    fn stored_script_runs_by_id() {
        let scripts = FixedScripts {
            custom1: Some("STRING one"),
            custom2: Some("DELAY 5\nSTRING two"),
        };
        let (kb, _) = dispatch(6, &scripts);
        assert_eq!(kb.typed(), ["one"]);

        let (kb, delay) = dispatch(7, &scripts);
        assert_eq!(kb.typed(), ["two"]);
        assert_eq!(delay.waits_ms.as_slice(), &[5]);
    }
}
