use glam::{DQuat, DVec3};
use rmachina::*;
use std::sync::Arc;

fn move_by(x: f64, y: f64, z: f64) -> ActionKind {
    ActionKind::Translation {
        delta: DVec3::new(x, y, z),
        relative: true,
    }
}

#[test]
fn test_compile_then_stream_same_actions() {
    let session = Session::from_config(&SessionConfig::default()).expect("default config");
    session.issue(move_by(100.0, 0.0, 0.0)).expect("applied");
    session.issue(move_by(0.0, 100.0, 0.0)).expect("applied");

    let program = session.compile_default(&MachinaCompiler::new(), "Preview");
    assert!(program.lines.iter().any(|line| line == "Move(0, 100, 0);"));

    let abb = AbbProtocol::new();
    let mut streamed = Vec::new();
    while let Some(messages) = session.stream_next(&abb) {
        streamed.extend(messages);
    }
    assert_eq!(streamed.len(), 2);
    assert_eq!(
        lock_cursor(session.write_cursor()).position(),
        Some(DVec3::new(100.0, 100.0, 0.0))
    );
    assert_eq!(
        lock_cursor(session.user_cursor()).position(),
        Some(DVec3::new(100.0, 100.0, 0.0))
    );
}

#[test]
fn test_sessions_have_independent_ids() {
    let a = Session::from_config(&SessionConfig::default()).expect("default config");
    let b = Session::from_config(&SessionConfig::default()).expect("default config");
    for _ in 0..3 {
        a.issue(ActionKind::Wait { millis: 1 });
    }
    let first_b = b.issue(ActionKind::Wait { millis: 1 }).expect("applied");
    assert_eq!(first_b.id().raw(), 1);
    assert_eq!(a.ids().last_id().raw(), 3);
}

#[test]
fn test_shared_generator_interleaves_ids() {
    let ids = Arc::new(ActionIdGenerator::new());
    let pose = InitialPose {
        position: Some(DVec3::ZERO),
        rotation: Some(DQuat::IDENTITY),
        ..InitialPose::default()
    };
    let left = Session::new("left", Arc::clone(&ids));
    let right = Session::new("right", Arc::clone(&ids));
    left.initialize(pose.clone(), Settings::default()).unwrap();
    right.initialize(pose, Settings::default()).unwrap();

    let a = left.issue(ActionKind::Wait { millis: 1 }).expect("applied");
    let b = right.issue(ActionKind::Wait { millis: 1 }).expect("applied");
    assert!(a.id() < b.id());
}

#[test]
fn test_config_tools_and_library_are_preloaded() {
    let dir = std::env::temp_dir().join(format!("rmachina-session-{}", std::process::id()));
    let library_path = dir.join("library.json");
    let mut library = ToolLibrary::new();
    library
        .add_tool(Tool::new(
            "spindle",
            DVec3::new(0.0, 0.0, 80.0),
            DQuat::IDENTITY,
            3.0,
            DVec3::new(0.0, 0.0, 30.0),
        ))
        .unwrap();
    library.save_to_path(&library_path).unwrap();

    let config = SessionConfig {
        name: "mill".to_string(),
        tools: vec![Tool::new(
            "probe",
            DVec3::new(0.0, 0.0, 20.0),
            DQuat::IDENTITY,
            0.1,
            DVec3::ZERO,
        )],
        tool_library: Some(library_path),
        ..SessionConfig::default()
    };
    let session = Session::from_config(&config).expect("valid config");
    assert_eq!(session.name(), "mill");
    assert!(session
        .issue(ActionKind::AttachTool {
            name: "spindle".to_string(),
        })
        .is_some());
    assert!(session
        .issue(ActionKind::AttachTool {
            name: "probe".to_string(),
        })
        .is_some());
    assert!(session
        .issue(ActionKind::AttachTool {
            name: "lathe".to_string(),
        })
        .is_none());

    let write = lock_cursor(session.write_cursor());
    assert_eq!(write.pending_count(), 2);
    drop(write);
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_config_without_pose_is_rejected() {
    let config = SessionConfig {
        initial_pose: InitialPose::default(),
        ..SessionConfig::default()
    };
    let err = Session::from_config(&config).unwrap_err();
    assert!(err.to_string().contains("axes"));
}

#[test]
fn test_block_compiles_only_frozen_part() {
    let session = Session::from_config(&SessionConfig::default()).expect("default config");
    session.issue(move_by(10.0, 0.0, 0.0));
    session.set_block();
    session.issue(move_by(0.0, 10.0, 0.0));

    let options = CompilerOptions {
        block_only: true,
        ..CompilerOptions::default()
    };
    let program = session.compile(&UrScriptCompiler::new(), "Block", &options);
    let moves = program
        .lines
        .iter()
        .filter(|line| line.trim_start().starts_with("movel("))
        .count();
    assert_eq!(moves, 1);
}

#[test]
fn test_concurrent_issue_keeps_every_action() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 500;

    let session = Session::from_config(&SessionConfig::default()).expect("default config");
    std::thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                for _ in 0..PER_THREAD {
                    assert!(session.issue(ActionKind::Wait { millis: 1 }).is_some());
                }
            });
        }
    });

    let mut write = lock_cursor(session.write_cursor());
    assert_eq!(write.pending_count(), THREADS * PER_THREAD);
    let released: Vec<u64> = std::iter::from_fn(|| write.apply_next_action())
        .map(|outcome| outcome.action.id().raw())
        .collect();
    let expected: Vec<u64> = (1..=(THREADS * PER_THREAD) as u64).collect();
    assert_eq!(released, expected);
}

#[test]
fn test_config_compiler_options_become_session_defaults() {
    let config = SessionConfig {
        compiler: CompilerOptions {
            comments: CommentMode::ActionId,
            ..CompilerOptions::default()
        },
        ..SessionConfig::default()
    };
    let session = Session::from_config(&config).expect("valid config");
    assert_eq!(session.compiler_options(), &config.compiler);

    session.issue(move_by(1.0, 0.0, 0.0));
    let program = session.compile_default(&MachinaCompiler::new(), "Tagged");
    assert!(program
        .lines
        .iter()
        .any(|line| line == "Move(1, 0, 0);  // [1]"));
}
