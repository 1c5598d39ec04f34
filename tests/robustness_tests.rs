use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

const CLIENT: &str = "0b7c9a52-3f1e-4d8a-9c61-2f4e5d6a7b80";

fn run(file: &NamedTempFile) -> assert_cmd::assert::Assert {
    Command::new(cargo_bin!("eventpay"))
        .env_remove("STRIPE_SECRET_KEY")
        .env_remove("RUST_LOG")
        .arg(file.path())
        .assert()
}

fn upgrade(intent: &str) -> String {
    format!(
        r#"{{"command":"payment_event","event_type":"checkout.session.completed","payload":{{"data":{{"object":{{"client_reference_id":"{CLIENT}","payment_intent":"{intent}","amount_total":250000,"metadata":{{"user_id":"{CLIENT}"}}}}}}}}}}"#
    )
}

#[test]
fn test_malformed_lines_are_skipped() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, r#"{{"command":"register_user","user_id":"{CLIENT}","name":"Asha","role":"client"}}"#).unwrap();
    writeln!(file, "# comments and blank lines are ignored").unwrap();
    writeln!(file).unwrap();
    writeln!(file, "this is not json").unwrap();
    writeln!(file, r#"{{"command":"teleport"}}"#).unwrap();
    writeln!(file, "{}", upgrade("pi_robust_1")).unwrap();

    run(&file)
        .success()
        .stderr(predicate::str::contains("skipping unreadable command"))
        .stdout(predicate::str::contains("admin,,2500,2500,0"));
}

#[test]
fn test_failing_commands_do_not_stop_the_batch() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, r#"{{"command":"register_user","user_id":"{CLIENT}","name":"Asha","role":"client"}}"#).unwrap();
    // Unknown booking, then a payment with an unusable amount.
    writeln!(
        file,
        r#"{{"command":"approve_booking","booking_id":"{CLIENT}","vendor_id":"{CLIENT}"}}"#
    )
    .unwrap();
    writeln!(
        file,
        r#"{{"command":"payment_event","event_type":"checkout.session.completed","payload":{{"data":{{"object":{{"client_reference_id":"{CLIENT}","payment_intent":"pi_zero","amount_total":0}}}}}}}}"#
    )
    .unwrap();
    writeln!(file, "{}", upgrade("pi_robust_2")).unwrap();
    writeln!(file, "{}", upgrade("pi_robust_2")).unwrap();

    run(&file)
        .success()
        .stderr(predicate::str::contains("command failed"))
        .stdout(predicate::str::contains("admin,,2500,2500,0"));
}
