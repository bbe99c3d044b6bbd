use std::{cell::RefCell, rc::Rc};

use cvs_svn_export_model::{Layout, Lod, SymbolKind, SymbolTable};

use super::*;

/// Records every delegate event as one line, for asserting against.
struct Recorder {
    events: Rc<RefCell<Vec<String>>>,
}

impl MirrorDelegate for Recorder {
    fn start_commit(&mut self, revnum: u32, _props: &RevProps) -> Result<(), Error> {
        self.events.borrow_mut().push(format!("start {}", revnum));
        Ok(())
    }

    fn end_commit(&mut self, revnum: u32) -> Result<(), Error> {
        self.events.borrow_mut().push(format!("end {}", revnum));
        Ok(())
    }

    fn initialize_project(&mut self, dirs: &[String]) -> Result<(), Error> {
        self.events
            .borrow_mut()
            .push(format!("project {}", dirs.join(",")));
        Ok(())
    }

    fn initialize_lod(&mut self, path: &str) -> Result<(), Error> {
        self.events.borrow_mut().push(format!("init-lod {}", path));
        Ok(())
    }

    fn mkdir(&mut self, path: &str) -> Result<(), Error> {
        self.events.borrow_mut().push(format!("mkdir {}", path));
        Ok(())
    }

    fn add_path(&mut self, content: &FileContent) -> Result<(), Error> {
        self.events.borrow_mut().push(format!(
            "add {} [{}]",
            content.path,
            String::from_utf8_lossy(content.text)
        ));
        Ok(())
    }

    fn change_path(&mut self, content: &FileContent) -> Result<(), Error> {
        self.events
            .borrow_mut()
            .push(format!("change {}", content.path));
        Ok(())
    }

    fn delete_lod(&mut self, path: &str) -> Result<(), Error> {
        self.events.borrow_mut().push(format!("rm-lod {}", path));
        Ok(())
    }

    fn delete_path(&mut self, path: &str) -> Result<(), Error> {
        self.events.borrow_mut().push(format!("rm {}", path));
        Ok(())
    }

    fn copy_lod(&mut self, src: &str, dest: &str, rev: u32) -> Result<(), Error> {
        self.events
            .borrow_mut()
            .push(format!("cp-lod {}@{} {}", src, rev, dest));
        Ok(())
    }

    fn copy_path(
        &mut self,
        src: &str,
        dest: &str,
        rev: u32,
        kind: PathKind,
    ) -> Result<(), Error> {
        self.events.borrow_mut().push(format!(
            "cp {}@{} {} ({:?})",
            src,
            rev,
            dest,
            kind
        ));
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Error> {
        self.events.borrow_mut().push("finish".into());
        Ok(())
    }
}

struct Fixture {
    mirror: Mirror,
    events: Rc<RefCell<Vec<String>>>,
    branch: Lod,
    tag: Lod,
    _dir: tempfile::TempDir,
}

fn fixture() -> Fixture {
    let mut symbols = SymbolTable::new();
    let branch = symbols.intern("stable", SymbolKind::Branch);
    let tag = symbols.intern("R1", SymbolKind::Tag);
    symbols.resolve_kinds(&[], &[]).unwrap();

    let events = Rc::new(RefCell::new(Vec::new()));
    let dir = tempfile::tempdir().unwrap();
    let mirror = Mirror::new(
        &dir.path().join("nodes.dat"),
        Layout::default(),
        symbols,
        vec![Box::new(Recorder {
            events: events.clone(),
        })],
    )
    .unwrap();

    Fixture {
        mirror,
        events,
        branch: Lod::Branch(branch),
        tag: Lod::Branch(tag),
        _dir: dir,
    }
}

fn props() -> RevProps {
    RevProps {
        author: b"adam".to_vec(),
        log: b"log".to_vec(),
        date: 1000,
    }
}

fn drain(events: &Rc<RefCell<Vec<String>>>) -> Vec<String> {
    events.borrow_mut().drain(..).collect()
}

#[test]
fn test_add_creates_parents() {
    let mut f = fixture();

    f.mirror.start_commit(1, &props()).unwrap();
    f.mirror.initialize_project().unwrap();
    f.mirror.end_commit().unwrap();

    f.mirror.start_commit(2, &props()).unwrap();
    f.mirror
        .add_file(&Lod::Trunk, "lib/util/io.c", b"text", false, None)
        .unwrap();
    f.mirror.end_commit().unwrap();

    assert_eq!(
        drain(&f.events),
        vec![
            "start 1",
            "project trunk,branches,tags",
            "end 1",
            "start 2",
            "mkdir trunk/lib",
            "mkdir trunk/lib/util",
            "add trunk/lib/util/io.c [text]",
            "end 2",
        ]
    );

    let entries = f.mirror.current_directory(&Lod::Trunk, "lib/util").unwrap();
    assert!(entries.contains_key("io.c"));
}

#[test]
fn test_add_existing_path_fails() {
    let mut f = fixture();

    f.mirror.start_commit(1, &props()).unwrap();
    f.mirror.initialize_project().unwrap();
    f.mirror
        .add_file(&Lod::Trunk, "a.txt", b"1", false, None)
        .unwrap();
    assert!(matches!(
        f.mirror.add_file(&Lod::Trunk, "a.txt", b"2", false, None),
        Err(Error::PathExists(_))
    ));
}

#[test]
fn test_change_requires_existing_file() {
    let mut f = fixture();

    f.mirror.start_commit(1, &props()).unwrap();
    f.mirror.initialize_project().unwrap();
    assert!(matches!(
        f.mirror.change_file(&Lod::Trunk, "a.txt", b"x", false, None),
        Err(Error::PathMissing(_))
    ));

    f.mirror
        .add_file(&Lod::Trunk, "a.txt", b"1", false, None)
        .unwrap();
    f.mirror
        .change_file(&Lod::Trunk, "a.txt", b"2", false, None)
        .unwrap();
}

#[test]
fn test_delete_with_prune_stops_at_root() {
    let mut f = fixture();

    f.mirror.start_commit(1, &props()).unwrap();
    f.mirror.initialize_project().unwrap();
    f.mirror.initialize_lod(&f.branch.clone()).unwrap();
    f.mirror
        .add_file(&f.branch.clone(), "lib/util/only.c", b"x", false, None)
        .unwrap();
    f.mirror
        .add_file(&f.branch.clone(), "keep.c", b"y", false, None)
        .unwrap();
    f.mirror.end_commit().unwrap();
    drain(&f.events);

    f.mirror.start_commit(2, &props()).unwrap();
    let deleted = f
        .mirror
        .delete_path(&f.branch.clone(), "lib/util/only.c", true)
        .unwrap();
    f.mirror.end_commit().unwrap();

    // lib/util and lib empty out; the branch root itself survives.
    assert_eq!(deleted, "branches/stable/lib");
    assert_eq!(
        drain(&f.events),
        vec!["start 2", "rm branches/stable/lib", "end 2"]
    );
    assert!(f.mirror.lod_exists(&f.branch));
    assert!(f
        .mirror
        .path_exists(&f.branch.clone(), "keep.c")
        .unwrap());
}

#[test]
fn test_delete_without_prune_leaves_empty_parent() {
    let mut f = fixture();

    f.mirror.start_commit(1, &props()).unwrap();
    f.mirror.initialize_project().unwrap();
    f.mirror
        .add_file(&Lod::Trunk, "lib/only.c", b"x", false, None)
        .unwrap();
    f.mirror.end_commit().unwrap();

    f.mirror.start_commit(2, &props()).unwrap();
    let deleted = f.mirror.delete_path(&Lod::Trunk, "lib/only.c", false).unwrap();
    assert_eq!(deleted, "trunk/lib/only.c");
    f.mirror.end_commit().unwrap();

    assert!(f.mirror.path_exists(&Lod::Trunk, "lib").unwrap());
}

#[test]
fn test_copy_lod_shares_structure_and_history() {
    let mut f = fixture();

    f.mirror.start_commit(1, &props()).unwrap();
    f.mirror.initialize_project().unwrap();
    f.mirror
        .add_file(&Lod::Trunk, "a.c", b"a1", false, None)
        .unwrap();
    f.mirror.end_commit().unwrap();

    f.mirror.start_commit(2, &props()).unwrap();
    f.mirror
        .add_file(&Lod::Trunk, "b.c", b"b1", false, None)
        .unwrap();
    f.mirror.end_commit().unwrap();
    drain(&f.events);

    // Tag from r1: only a.c existed then.
    f.mirror.start_commit(3, &props()).unwrap();
    f.mirror.copy_lod(&Lod::Trunk, &f.tag.clone(), 1).unwrap();
    f.mirror.end_commit().unwrap();

    assert_eq!(
        drain(&f.events),
        vec!["start 3", "cp-lod trunk@1 tags/R1", "end 3"]
    );

    let entries = f.mirror.current_directory(&f.tag.clone(), "").unwrap();
    assert!(entries.contains_key("a.c"));
    assert!(!entries.contains_key("b.c"));

    // The old trunk view is unaffected by the copy.
    let old = f.mirror.old_directory(&Lod::Trunk, "", 2).unwrap();
    assert!(old.contains_key("b.c"));
}

#[test]
fn test_copy_lod_to_occupied_destination_fails() {
    let mut f = fixture();

    f.mirror.start_commit(1, &props()).unwrap();
    f.mirror.initialize_project().unwrap();
    f.mirror.end_commit().unwrap();

    f.mirror.start_commit(2, &props()).unwrap();
    f.mirror.copy_lod(&Lod::Trunk, &f.tag.clone(), 1).unwrap();
    assert!(matches!(
        f.mirror.copy_lod(&Lod::Trunk, &f.tag.clone(), 1),
        Err(Error::PathExists(_))
    ));
}

#[test]
fn test_copy_path_from_old_revision() {
    let mut f = fixture();

    f.mirror.start_commit(1, &props()).unwrap();
    f.mirror.initialize_project().unwrap();
    f.mirror
        .add_file(&Lod::Trunk, "lib/a.c", b"v1", false, None)
        .unwrap();
    f.mirror.end_commit().unwrap();

    f.mirror.start_commit(2, &props()).unwrap();
    f.mirror
        .change_file(&Lod::Trunk, "lib/a.c", b"v2", false, None)
        .unwrap();
    f.mirror.end_commit().unwrap();
    drain(&f.events);

    f.mirror.start_commit(3, &props()).unwrap();
    f.mirror
        .copy_path("lib/a.c", &Lod::Trunk, &f.branch.clone(), 1)
        .unwrap();
    f.mirror.end_commit().unwrap();

    assert_eq!(
        drain(&f.events),
        vec![
            "start 3",
            "init-lod branches/stable",
            "mkdir branches/stable/lib",
            "cp trunk/lib/a.c@1 branches/stable/lib/a.c (File)",
            "end 3",
        ]
    );
    assert!(f
        .mirror
        .path_exists(&f.branch.clone(), "lib/a.c")
        .unwrap());
}

#[test]
fn test_old_directory_survives_later_changes() {
    let mut f = fixture();

    f.mirror.start_commit(1, &props()).unwrap();
    f.mirror.initialize_project().unwrap();
    f.mirror
        .add_file(&Lod::Trunk, "lib/a.c", b"x", false, None)
        .unwrap();
    f.mirror.end_commit().unwrap();

    f.mirror.start_commit(2, &props()).unwrap();
    f.mirror.delete_path(&Lod::Trunk, "lib/a.c", false).unwrap();
    f.mirror.end_commit().unwrap();

    let old = f.mirror.old_directory(&Lod::Trunk, "lib", 1).unwrap();
    assert!(old.contains_key("a.c"));
    let now = f.mirror.current_directory(&Lod::Trunk, "lib").unwrap();
    assert!(now.is_empty());
}

#[test]
fn test_delete_lod() {
    let mut f = fixture();

    f.mirror.start_commit(1, &props()).unwrap();
    f.mirror.initialize_project().unwrap();
    f.mirror.initialize_lod(&f.branch.clone()).unwrap();
    f.mirror.end_commit().unwrap();
    drain(&f.events);

    f.mirror.start_commit(2, &props()).unwrap();
    f.mirror.delete_lod(&f.branch.clone()).unwrap();
    f.mirror.end_commit().unwrap();

    assert_eq!(
        drain(&f.events),
        vec!["start 2", "rm-lod branches/stable", "end 2"]
    );
    assert!(!f.mirror.lod_exists(&f.branch));
}

#[test]
fn test_ops_outside_commit_fail() {
    let mut f = fixture();
    assert!(matches!(
        f.mirror.add_file(&Lod::Trunk, "a", b"", false, None),
        Err(Error::NoCommit)
    ));
}

#[test]
fn test_finish_reports_to_delegates() {
    let mut f = fixture();
    f.mirror.finish().unwrap();
    assert_eq!(drain(&f.events), vec!["finish"]);
}
