mod cli_support;

use cli_support::{assert_cli_success, run_cli, CliEnv};
use std::fs;

const LOOKUP: &str = "\
title|nlp|start_day|start_month|start_year|end_day|end_month|end_year
BNWL|38|1|January|1800|31|December|1900
";

const METADATA: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<lwm>\n  <publication id=\"BNWL\">\n    <issue id=\"0001\">\n      <date>1874-01-01</date>\n    </issue>\n  </publication>\n</lwm>\n";

#[test]
fn rewrite_ids_uses_lookup_file() {
    let env = CliEnv::new();
    env.write_input("BNWL/1874/01/01/WO1_BNWL_1874_01_01-0001_metadata.xml", METADATA);
    env.write_input("BNWL/1874/01/01/WO1_BNWL_1874_01_01-0001.txt", "text");
    let lookup = env.write_root("lookup.csv", LOOKUP);

    let input = CliEnv::arg(&env.input_dir);
    let output = CliEnv::arg(&env.output_dir);
    let working = CliEnv::arg(&env.working_dir);
    let lookup = CliEnv::arg(&lookup);
    let args = ["rewrite-ids", &input, &output, "--lookup", &lookup, "-w", &working];
    let result = run_cli(&args);
    assert_cli_success(&result, &args);

    let xml = fs::read_to_string(
        env.output_dir
            .join("BNWL/1874/01/01/WO1_BNWL_1874_01_01-0001_metadata.xml"),
    )
    .unwrap();
    assert!(xml.contains("<publication id=\"0000038\">"), "{}", xml);
    assert!(String::from_utf8_lossy(&result.stdout).contains("Identifier rewrite complete"));
    assert!(env.run_dir().join("jw_alto2txt.log").is_file());
}

#[test]
fn rewrite_ids_refuses_non_empty_output() {
    let env = CliEnv::new();
    env.write_input("BNWL/1874/01/01/a_metadata.xml", METADATA);
    env.write_input("BNWL/1874/01/01/a.txt", "text");
    env.write_root("output/leftover.txt", "old");
    let lookup = env.write_root("lookup.csv", LOOKUP);

    let input = CliEnv::arg(&env.input_dir);
    let output = CliEnv::arg(&env.output_dir);
    let working = CliEnv::arg(&env.working_dir);
    let lookup = CliEnv::arg(&lookup);
    let result = run_cli(&["rewrite-ids", &input, &output, "--lookup", &lookup, "-w", &working]);

    assert_eq!(result.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&result.stderr).contains("Output directory is not empty"));
    assert!(!env.output_dir.join("BNWL").exists());
}

#[test]
fn bad_lookup_file_exits_before_run_dir() {
    let env = CliEnv::new();
    env.write_input("BNWL/1874/01/01/a_metadata.xml", METADATA);
    let lookup = env.write_root("lookup.csv", "title|nlp\nBNWL|38\n");

    let input = CliEnv::arg(&env.input_dir);
    let output = CliEnv::arg(&env.output_dir);
    let working = CliEnv::arg(&env.working_dir);
    let lookup = CliEnv::arg(&lookup);
    let result = run_cli(&["rewrite-ids", &input, &output, "--lookup", &lookup, "-w", &working]);

    assert_eq!(result.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("Cannot load title code lookup"), "{}", stderr);
    assert_eq!(fs::read_dir(&env.working_dir).unwrap().count(), 0);
}
