use autopilot_sync::{ConflictResolver, Strategy};

use crate::Workspace;

pub fn execute(ws: &Workspace) -> anyhow::Result<()> {
    let git = ws.git();
    git.verify_work_tree()?;

    let assistant = ws.assistant();
    let resolved = ConflictResolver::new(crate::as_dyn(&assistant), &ws.settings).resolve_all(&git);
    if resolved.is_empty() {
        println!("No conflicted files.");
        return Ok(());
    }
    for f in &resolved {
        let how = match f.strategy {
            Strategy::Assistant => "assistant",
            Strategy::UnionMerge => "union merge",
        };
        println!("Resolved {} ({how})", f.path);
    }
    println!("Staged {} file(s); run `git rebase --continue` when ready.", resolved.len());
    Ok(())
}
