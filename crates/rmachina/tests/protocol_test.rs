use glam::{DQuat, DVec3};
use rmachina::*;
use std::sync::Arc;

fn write_cursor(kinds: Vec<ActionKind>) -> RobotCursor {
    let ids = ActionIdGenerator::new();
    let mut cursor = RobotCursor::builder("write").build();
    cursor
        .initialize(
            InitialPose {
                position: Some(DVec3::ZERO),
                rotation: Some(DQuat::IDENTITY),
                ..InitialPose::default()
            },
            Settings::default(),
        )
        .expect("valid pose");
    for kind in kinds {
        assert!(cursor.issue(Arc::new(Action::new(&ids, kind))));
    }
    cursor
}

fn stream_all(
    protocol: &dyn StreamingProtocol,
    cursor: &mut RobotCursor,
) -> Vec<Vec<WireMessage>> {
    let mut frames = Vec::new();
    while let Some(messages) = protocol.next_messages(cursor) {
        frames.push(messages);
    }
    frames
}

fn text(message: &WireMessage) -> &str {
    message.as_text().expect("text frame")
}

fn speed_to(value: f64) -> ActionKind {
    ActionKind::Speed {
        value,
        relative: false,
    }
}

#[test]
fn test_pop_emits_single_restoring_speed_message() {
    let mut cursor = write_cursor(vec![
        ActionKind::PushSettings,
        speed_to(50.0),
        ActionKind::PopSettings,
    ]);
    let frames = stream_all(&AbbProtocol::new(), &mut cursor);

    assert_eq!(frames.len(), 3);
    assert!(frames[0].is_empty(), "push has no wire form");
    assert_eq!(frames[1], vec![WireMessage::Text("@2 4 50.000;".to_string())]);
    assert_eq!(frames[2], vec![WireMessage::Text("@3 4 20.000;".to_string())]);
    assert_eq!(cursor.speed(), 20.0);
}

#[test]
fn test_pop_without_changes_sends_nothing() {
    let mut cursor = write_cursor(vec![
        speed_to(50.0),
        ActionKind::PushSettings,
        speed_to(50.0),
        ActionKind::PopSettings,
    ]);
    let frames = stream_all(&AbbProtocol::new(), &mut cursor);
    assert_eq!(frames.len(), 4);
    assert!(frames[3].is_empty());
}

#[test]
fn test_only_last_pop_message_carries_the_id() {
    let mut cursor = write_cursor(vec![
        ActionKind::PushSettings,
        speed_to(50.0),
        ActionKind::Precision {
            value: 1.0,
            relative: false,
        },
        ActionKind::MotionMode(MotionType::Joint),
        ActionKind::PopSettings,
    ]);
    let frames = stream_all(&AbbProtocol::new(), &mut cursor);
    let pop: Vec<&str> = frames[4].iter().map(text).collect();
    assert_eq!(pop, vec!["@0 4 20.000;", "@5 5 5.000;"]);
    assert_eq!(cursor.settings().motion_type, MotionType::Linear);
}

#[test]
fn test_abb_motion_frames() {
    let mut cursor = write_cursor(vec![
        ActionKind::Translation {
            delta: DVec3::new(100.0, 0.0, 0.0),
            relative: false,
        },
        ActionKind::MotionMode(MotionType::Joint),
        ActionKind::Translation {
            delta: DVec3::new(0.0, 0.0, 50.0),
            relative: true,
        },
        ActionKind::Axes {
            joints: Joints::new([0.0, 0.0, 0.0, 0.0, 90.0, 0.0]),
            relative: false,
        },
    ]);
    let frames = stream_all(&AbbProtocol::new(), &mut cursor);
    let texts: Vec<&str> = frames.iter().flatten().map(text).collect();
    assert_eq!(
        texts,
        vec![
            "@1 1 100.000 0.000 0.000 1.000000 0.000000 0.000000 0.000000;",
            "@3 2 100.000 0.000 50.000 1.000000 0.000000 0.000000 0.000000;",
            "@4 3 0.000 0.000 0.000 0.000 90.000 0.000;",
        ]
    );
}

#[test]
fn test_abb_io_tools_and_messages() {
    let gripper = Tool::new(
        "gripper",
        DVec3::new(0.0, 0.0, 100.0),
        DQuat::IDENTITY,
        2.0,
        DVec3::ZERO,
    );
    let mut cursor = write_cursor(vec![
        ActionKind::DefineTool(gripper),
        ActionKind::AttachTool {
            name: "gripper".to_string(),
        },
        ActionKind::WriteDigitalIO {
            pin: "DO_1".to_string(),
            on: true,
            tool_pin: false,
        },
        ActionKind::Message("done".to_string()),
        ActionKind::Wait { millis: 1500 },
        ActionKind::DetachTool,
        ActionKind::Comment("not streamed".to_string()),
    ]);
    let frames = stream_all(&AbbProtocol::new(), &mut cursor);
    let texts: Vec<&str> = frames.iter().flatten().map(text).collect();
    assert_eq!(
        texts,
        vec![
            "@2 8 0.000 0.000 100.000 1.000000 0.000000 0.000000 0.000000 \
             2.000 0.000 0.000 0.000;",
            "@3 10 \"DO_1\" 1;",
            "@4 7 \"done\";",
            "@5 6 1.500;",
            "@6 9;",
        ]
    );
    assert_eq!(frames.len(), 7, "every action is released once");
}

#[test]
fn test_streaming_releases_in_id_order() {
    let kinds: Vec<ActionKind> = (1..=10)
        .map(|i| ActionKind::Wait { millis: i * 10 })
        .collect();
    let mut cursor = write_cursor(kinds);
    let frames = stream_all(&AbbProtocol::new(), &mut cursor);
    let acked: Vec<u64> = frames
        .iter()
        .flatten()
        .filter_map(|message| {
            let frame = text(message).replacen('@', ">", 1);
            AbbProtocol::parse_ack(&frame).map(|id| id.raw())
        })
        .collect();
    let expected: Vec<u64> = (1..=10).collect();
    assert_eq!(acked, expected);
}

#[test]
fn test_failed_action_is_consumed_without_messages() {
    let mut cursor = write_cursor(vec![
        ActionKind::DetachTool,
        ActionKind::Wait { millis: 5 },
    ]);
    let abb = AbbProtocol::new();
    assert_eq!(abb.next_messages(&mut cursor), Some(Vec::new()));
    assert_eq!(
        abb.next_messages(&mut cursor),
        Some(vec![WireMessage::Text("@2 6 0.005;".to_string())])
    );
    assert_eq!(abb.next_messages(&mut cursor), None);
}

#[test]
fn test_ur_fixed_point_frames() {
    let mut cursor = write_cursor(vec![
        ActionKind::Translation {
            delta: DVec3::new(100.0, 0.0, 0.0),
            relative: false,
        },
        ActionKind::Axes {
            joints: Joints::new([0.0, 0.0, 0.0, 0.0, 90.0, 0.0]),
            relative: false,
        },
        ActionKind::Wait { millis: 1500 },
        ActionKind::WriteAnalogIO {
            pin: "0".to_string(),
            value: 5.0,
            tool_pin: false,
        },
        ActionKind::WriteDigitalIO {
            pin: "2".to_string(),
            on: true,
            tool_pin: true,
        },
        ActionKind::WriteDigitalIO {
            pin: "3".to_string(),
            on: true,
            tool_pin: false,
        },
    ]);
    let frames = stream_all(&UrProtocol::new(), &mut cursor);
    let binary: Vec<Vec<i32>> = frames
        .iter()
        .map(|messages| {
            messages
                .iter()
                .flat_map(|m| m.as_binary().expect("binary frame").to_vec())
                .collect()
        })
        .collect();

    assert_eq!(
        binary,
        vec![
            vec![1, UrOpcode::MoveL as i32, 1000, 0, 0, 0, 0, 0],
            vec![2, UrOpcode::MoveJ as i32, 0, 0, 0, 0, 15708, 0],
            vec![3, UrOpcode::Wait as i32, 1500],
            vec![4, UrOpcode::SetAO as i32, 0, 5_000_000],
            vec![],
            vec![6, UrOpcode::SetDO as i32, 3, 1],
        ]
    );
}

#[test]
fn test_ur_pop_uses_no_ack_for_earlier_messages() {
    let mut cursor = write_cursor(vec![
        ActionKind::PushSettings,
        speed_to(100.0),
        ActionKind::Acceleration {
            value: 500.0,
            relative: false,
        },
        ActionKind::PopSettings,
    ]);
    let frames = stream_all(&UrProtocol::new(), &mut cursor);
    assert_eq!(
        frames[3],
        vec![
            WireMessage::Binary(vec![0, UrOpcode::Speed as i32, 200]),
            WireMessage::Binary(vec![4, UrOpcode::Acceleration as i32, 0]),
        ]
    );
    assert_eq!(
        frames[1][0].to_bytes(),
        vec![0, 0, 0, 2, 0, 0, 0, 4, 0, 0, 0x03, 0xE8]
    );
}
