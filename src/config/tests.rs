use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_resolve_without_any_source() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.to_string(), "127.0.0.1:3000");
    assert_eq!(settings.page.name, DEFAULT_PAGE_NAME);
    assert_eq!(settings.page.title, DEFAULT_PAGE_TITLE);
    assert_eq!(
        settings.page.deferred_delay,
        Duration::from_millis(DEFAULT_DEFERRED_DELAY_MS)
    );
    assert!(settings.page.status.is_none());
    assert!(settings.page.headers.is_empty());
    assert!(matches!(settings.logging.format, LogFormat::Compact));
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn page_overrides_replace_file_values() {
    let mut raw = RawSettings::default();
    raw.page.name = Some("File User".to_string());
    raw.page.identifier_prefix = Some("file-".to_string());

    raw.apply_page_overrides(&PageOverrides {
        name: Some("Alice".to_string()),
        deferred_delay_ms: Some(0),
        ..Default::default()
    });
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.page.name, "Alice");
    assert_eq!(settings.page.identifier_prefix.as_deref(), Some("file-"));
    assert_eq!(settings.page.deferred_delay, Duration::ZERO);
}

#[test]
fn blank_page_values_fall_back_to_defaults() {
    let mut raw = RawSettings::default();
    raw.page.name = Some("   ".to_string());
    raw.page.nonce = Some(String::new());

    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.page.name, DEFAULT_PAGE_NAME);
    assert!(settings.page.nonce.is_none());
}

#[test]
fn bootstrap_script_content_is_trimmed_and_optional() {
    let mut raw = RawSettings::default();
    raw.page.bootstrap_script_content = Some("  window.__BOOTED__ = true;\n".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(
        settings.page.bootstrap_script_content.as_deref(),
        Some("window.__BOOTED__ = true;")
    );

    let mut raw = RawSettings::default();
    raw.page.bootstrap_script_content = Some("   ".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.page.bootstrap_script_content.is_none());
}

#[test]
fn page_headers_are_normalised_to_lowercase() {
    let mut raw = RawSettings::default();
    raw.page.headers = Some(BTreeMap::from([(
        "X-Custom-Streaming-Header".to_string(),
        "active".to_string(),
    )]));

    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(
        settings.page.headers,
        vec![(
            "x-custom-streaming-header".to_string(),
            "active".to_string()
        )]
    );
}

#[test]
fn rejects_out_of_range_status() {
    let mut raw = RawSettings::default();
    raw.page.status = Some(700);

    let err = Settings::from_raw(raw).expect_err("700 is not a status code");
    assert!(matches!(err, LoadError::Invalid { key: "page.status", .. }));
}

#[test]
fn rejects_zero_chunk_size() {
    let mut raw = RawSettings::default();
    raw.page.progressive_chunk_size = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero chunk size is invalid");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "page.progressive_chunk_size",
            ..
        }
    ));
}

#[test]
fn rejects_zero_port() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(0);

    let err = Settings::from_raw(raw).expect_err("port zero is invalid");
    assert!(matches!(err, LoadError::Invalid { key: "server.port", .. }));
}

#[test]
fn rejects_unparsable_log_level() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("loud".to_string());

    let err = Settings::from_raw(raw).expect_err("unknown level");
    assert!(matches!(err, LoadError::Invalid { key: "logging.level", .. }));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["shellstream"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_arguments() {
    let args = CliArgs::parse_from([
        "shellstream",
        "serve",
        "--server-port",
        "8080",
        "--page-name",
        "Alice",
        "--log-json",
        "true",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_port, Some(8080));
            assert_eq!(serve.overrides.page.name.as_deref(), Some("Alice"));
            assert_eq!(serve.overrides.log_json, Some(true));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_render_arguments() {
    let args = CliArgs::parse_from([
        "shellstream",
        "render",
        "--page-identifier-prefix",
        "cli-",
    ]);

    match args.command.expect("render command") {
        Command::Render(render) => {
            assert_eq!(render.page.identifier_prefix.as_deref(), Some("cli-"));
            assert!(render.page.name.is_none());
        }
        _ => panic!("wrong command parsed"),
    }
}
