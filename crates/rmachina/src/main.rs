use rmachina::*;

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let target = args.get(1).map(|s| s.as_str()).unwrap_or("rapid");

    let mut config = match args.get(2) {
        Some(path) => match SessionConfig::load_from_path(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {e:#}");
                std::process::exit(1);
            }
        },
        None => SessionConfig::default(),
    };
    if config.tool_library.is_none() {
        // A missing library file loads as empty.
        config.tool_library = ToolLibrary::default_library_path().ok();
    }

    let compiler: Option<Box<dyn Compiler>> = match target {
        "rapid" => Some(Box::new(RapidCompiler::new())),
        "krl" => Some(Box::new(KrlCompiler::new())),
        "urscript" => Some(Box::new(UrScriptCompiler::new())),
        "gcode" => Some(Box::new(GCodeCompiler::new())),
        "machina" => Some(Box::new(MachinaCompiler::new())),
        _ => None,
    };
    let protocol: Option<Box<dyn StreamingProtocol>> = match target {
        "abb" => Some(Box::new(AbbProtocol::new())),
        "ur" => Some(Box::new(UrProtocol::new())),
        _ => None,
    };
    if compiler.is_none() && protocol.is_none() {
        print_usage();
        return;
    }

    let session = match Session::from_config(&config) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    };
    if target == "gcode" {
        issue_print_demo(&session);
    } else {
        issue_arm_demo(&session);
    }

    if let Some(compiler) = compiler {
        let program = session.compile_default(compiler.as_ref(), "Demo");
        print!("{}", program.to_text());
    }
    if let Some(protocol) = protocol {
        while let Some(messages) = session.stream_next(protocol.as_ref()) {
            for message in messages {
                match &message {
                    WireMessage::Text(text) => println!("{text}"),
                    WireMessage::Binary(values) => println!("{values:?}"),
                }
            }
        }
    }
}

fn print_usage() {
    println!("Usage: rmachina [rapid|krl|urscript|gcode|machina|abb|ur] [config.json]");
    println!("  rapid     - Compile the demo to ABB RAPID (default)");
    println!("  krl       - Compile the demo to KUKA KRL");
    println!("  urscript  - Compile the demo to URScript");
    println!("  gcode     - Compile a printing demo to G-code");
    println!("  machina   - Print the demo as action calls");
    println!("  abb       - Stream the demo as ABB text frames");
    println!("  ur        - Stream the demo as UR binary frames");
}

fn issue_arm_demo(session: &Session) {
    let gripper = Tool::new(
        "gripper",
        glam::DVec3::new(0.0, 0.0, 150.0),
        glam::DQuat::IDENTITY,
        1.2,
        glam::DVec3::new(0.0, 0.0, 60.0),
    );
    let actions = vec![
        ActionKind::Message("Starting demo".to_string()),
        ActionKind::DefineTool(gripper),
        ActionKind::AttachTool {
            name: "gripper".to_string(),
        },
        ActionKind::Speed {
            value: 100.0,
            relative: false,
        },
        ActionKind::Translation {
            delta: glam::DVec3::new(300.0, 0.0, 500.0),
            relative: false,
        },
        ActionKind::PushSettings,
        ActionKind::Speed {
            value: 25.0,
            relative: false,
        },
        ActionKind::Precision {
            value: 0.0,
            relative: false,
        },
        ActionKind::Translation {
            delta: glam::DVec3::new(0.0, 0.0, -100.0),
            relative: true,
        },
        ActionKind::WriteDigitalIO {
            pin: "1".to_string(),
            on: true,
            tool_pin: false,
        },
        ActionKind::Wait { millis: 500 },
        ActionKind::PopSettings,
        ActionKind::Translation {
            delta: glam::DVec3::new(0.0, 0.0, 100.0),
            relative: true,
        },
        ActionKind::Axes {
            joints: Joints::new([0.0, 0.0, 0.0, 0.0, 90.0, 0.0]),
            relative: false,
        },
        ActionKind::DetachTool,
    ];
    for kind in actions {
        session.issue(kind);
    }
}

fn issue_print_demo(session: &Session) {
    let mut actions = vec![
        ActionKind::Initialization(true),
        ActionKind::Temperature {
            part: RobotPart::Bed,
            value: 60.0,
            wait: false,
            relative: false,
        },
        ActionKind::Temperature {
            part: RobotPart::Extruder,
            value: 210.0,
            wait: true,
            relative: false,
        },
        ActionKind::ExtrusionRate {
            value: 0.05,
            relative: false,
        },
        ActionKind::Translation {
            delta: glam::DVec3::new(50.0, 50.0, 0.2),
            relative: false,
        },
        ActionKind::Extrusion(true),
    ];
    for delta in [(40.0, 0.0), (0.0, 40.0), (-40.0, 0.0), (0.0, -40.0)] {
        actions.push(ActionKind::Translation {
            delta: glam::DVec3::new(delta.0, delta.1, 0.0),
            relative: true,
        });
    }
    actions.push(ActionKind::Extrusion(false));
    actions.push(ActionKind::Initialization(false));
    for kind in actions {
        session.issue(kind);
    }
}
