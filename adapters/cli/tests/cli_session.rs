use std::process::Command;

fn run(args: &[&str]) -> String {
    let output = Command::new(env!("CARGO_BIN_EXE_worm-bricks"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to launch worm-bricks");
    assert!(output.status.success(), "worm-bricks exited with {}", output.status);
    String::from_utf8(output.stdout).expect("utf-8 output")
}

#[test]
fn session_prints_banner_grid_and_summary() {
    let stdout = run(&["--ticks", "30", "--width", "320", "--height", "256", "--seed", "7"]);

    assert!(stdout.starts_with("Welcome to Worm bricks."));
    assert!(stdout.contains("ticks: 30"));
    let grid_rows: Vec<&str> = stdout
        .lines()
        .filter(|line| !line.is_empty() && line.chars().all(|c| ".ox*".contains(c)))
        .collect();
    assert_eq!(grid_rows.len(), 7);
    assert!(grid_rows.iter().all(|row| row.len() == 9));
}

#[test]
fn same_seed_replays_identically() {
    let args = ["--ticks", "60", "--width", "480", "--height", "320", "--seed", "11", "--pilot"];
    assert_eq!(run(&args), run(&args));
}

#[test]
fn dump_config_emits_effective_tuning() {
    let stdout = run(&["--dump-config", "--seed", "5", "--worms", "3"]);

    assert!(stdout.contains("seed = 5"));
    assert!(stdout.contains("worm_count = 3"));
    assert!(!stdout.contains("Welcome"));
}

#[test]
fn periodic_output_includes_sprite_frame() {
    let stdout = run(&["--ticks", "4", "--width", "320", "--height", "256", "--print-every", "2"]);

    assert_eq!(stdout.lines().filter(|line| *line == "sprites").count(), 2);
    assert!(stdout.lines().any(|line| line.len() == 9 && line.contains('#')));
}
