use autopilot_core::{CycleLock, TagPicker};
use autopilot_sync::{save_report, SyncCycle};

use crate::Workspace;

pub fn execute(ws: &Workspace, no_lock: bool) -> anyhow::Result<()> {
    // Fail before touching .git/autopilot when the root is not a repository.
    ws.git().verify_work_tree()?;

    let _lock = if no_lock {
        None
    } else {
        ws.paths.ensure_layout()?;
        Some(CycleLock::acquire(&ws.paths)?)
    };

    let assistant = ws.assistant();
    let report = SyncCycle::new(
        &ws.gw,
        crate::as_dyn(&assistant),
        &ws.settings,
        TagPicker::from_entropy(),
    )
    .run()?;

    if ws.settings.remember_last_cycle {
        if let Err(e) = save_report(&ws.paths, &report) {
            tracing::warn!("could not record cycle: {e:#}");
        }
    }

    println!("{}", report.result);
    Ok(())
}
