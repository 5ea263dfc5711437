use std::process::Command;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_instrunet_cli"))
}

#[test]
fn classes_lists_taxonomy_in_order() {
    let output = cli()
        .arg("classes")
        .output()
        .expect("failed to run instrunet_cli classes");
    assert!(
        output.status.success(),
        "CLI exited with {:?}",
        output.status.code()
    );

    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 11);
    assert!(lines[0].contains("cel") && lines[0].contains("Cello"));
    assert!(lines[10].contains("voi"));
}

#[test]
fn analyze_with_missing_model_fails() {
    let audio = std::env::temp_dir().join(format!("instrunet-cli-{}.wav", std::process::id()));
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 22_050,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&audio, spec).expect("create wav");
    for _ in 0..22_050 {
        writer.write_sample(0i16).expect("write sample");
    }
    writer.finalize().expect("finalize wav");

    let output = cli()
        .args(["analyze", "--audio"])
        .arg(&audio)
        .args(["--model", "/nonexistent/instrunet.onnx"])
        .output()
        .expect("failed to run instrunet_cli analyze");
    let _ = std::fs::remove_file(&audio);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).expect("stderr UTF-8");
    assert!(
        stderr.contains("loading model"),
        "expected model load context, got {stderr}"
    );
    assert!(output.stdout.is_empty());
}

#[test]
fn analyze_rejects_unknown_aggregation() {
    let output = cli()
        .args([
            "analyze",
            "--audio",
            "song.wav",
            "--model",
            "model.onnx",
            "--aggregation",
            "bogus",
        ])
        .output()
        .expect("failed to run instrunet_cli analyze");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).expect("stderr UTF-8");
    assert!(stderr.contains("bogus"), "expected rejection, got {stderr}");
}

#[test]
fn missing_required_argument_exits_with_one() {
    let output = cli()
        .args(["analyze", "--audio", "song.wav"])
        .output()
        .expect("failed to run instrunet_cli analyze");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).expect("stderr UTF-8");
    assert!(stderr.contains("--model"), "expected usage error, got {stderr}");
}

#[test]
fn help_exits_with_zero() {
    let output = cli()
        .arg("--help")
        .output()
        .expect("failed to run instrunet_cli --help");

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    assert!(stdout.contains("analyze"));
}

#[test]
fn analyze_rejects_out_of_range_threshold() {
    let output = cli()
        .args([
            "analyze",
            "--audio",
            "song.wav",
            "--model",
            "model.onnx",
            "--threshold",
            "1.5",
        ])
        .output()
        .expect("failed to run instrunet_cli analyze");

    assert_eq!(output.status.code(), Some(1));
}
