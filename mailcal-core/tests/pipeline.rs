use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use mailcal_core::ics::{CALENDAR_FOOTER, CALENDAR_HEADER};
use mailcal_core::{OutputTarget, Pipeline, RunOptions, RunOutcome};
use tempfile::TempDir;

const EVT1: &str = "BEGIN:VEVENT\nUID:evt1\nDTSTAMP:20240101T000000Z\n\
DTSTART:20240615T090000Z\nDTEND:20240615T100000Z\nEND:VEVENT\n";

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        for sub in ["cur", "new", "tmp"] {
            std::fs::create_dir_all(dir.path().join("Maildir").join(sub)).unwrap();
        }
        Fixture { dir }
    }

    fn maildir(&self) -> PathBuf {
        self.dir.path().join("Maildir")
    }

    fn output(&self) -> PathBuf {
        self.dir.path().join("calendar.ics")
    }

    fn deliver(&self, name: &str, vevents: &str) {
        std::fs::write(self.maildir().join("cur").join(name), invite(vevents)).unwrap();
    }

    fn options(&self) -> RunOptions {
        let mut options = RunOptions::new(self.maildir(), self.dir.path().join("cache"));
        options.output = OutputTarget::File(self.output());
        options
    }

    fn run(&self, options: RunOptions) -> (Pipeline, RunOutcome) {
        let mut pipeline = Pipeline::new(options).unwrap().with_today(today());
        let outcome = pipeline.run().unwrap();
        (pipeline, outcome)
    }

    fn events_dir(&self) -> PathBuf {
        let pipeline = Pipeline::new(self.options()).unwrap();
        pipeline.layout().events_dir()
    }

    fn document(&self) -> String {
        std::fs::read_to_string(self.output()).unwrap()
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
}

/// A two-part mail: a text part and a text/calendar part.
fn invite(vevents: &str) -> String {
    let calendar = format!(
        "BEGIN:VCALENDAR\nVERSION:2.0\nPRODID:-//Test//Sender//EN\nMETHOD:REQUEST\n{}END:VCALENDAR\n",
        vevents
    )
    .replace('\n', "\r\n");

    format!(
        "From: organizer@example.com\r\n\
To: me@example.com\r\n\
Subject: Invitation\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/alternative; boundary=\"b1\"\r\n\
\r\n\
--b1\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
You have been invited.\r\n\
--b1\r\n\
Content-Type: text/calendar; charset=utf-8; method=REQUEST\r\n\
Content-Transfer-Encoding: 7bit\r\n\
\r\n\
{}\
--b1--\r\n",
        calendar
    )
}

fn modified(path: &Path) -> std::time::SystemTime {
    std::fs::metadata(path).unwrap().modified().unwrap()
}

#[test]
fn single_invite_end_to_end() {
    let fx = Fixture::new();
    fx.deliver("1", EVT1);

    let (pipeline, outcome) = fx.run(fx.options());
    assert_eq!(
        outcome,
        RunOutcome {
            extracted: true,
            generated: true
        }
    );

    let events_dir = pipeline.layout().events_dir();
    let names: Vec<_> = std::fs::read_dir(&events_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(names, vec!["evt1"]);
    assert_eq!(std::fs::read_to_string(events_dir.join("evt1")).unwrap(), EVT1);

    assert_eq!(
        fx.document(),
        format!("{}{}{}", CALENDAR_HEADER, EVT1, CALENDAR_FOOTER)
    );
}

#[test]
fn unchanged_inputs_skip_both_levels() {
    let fx = Fixture::new();
    fx.deliver("1", EVT1);
    fx.run(fx.options());

    let stored = fx.events_dir().join("evt1");
    let stored_mtime = modified(&stored);
    let output_mtime = modified(&fx.output());

    let (_, outcome) = fx.run(fx.options());
    assert_eq!(outcome, RunOutcome::default());
    assert_eq!(modified(&stored), stored_mtime);
    assert_eq!(modified(&fx.output()), output_mtime);
}

#[test]
fn window_change_only_regenerates_document() {
    let fx = Fixture::new();
    fx.deliver("1", EVT1);
    fx.run(fx.options());

    let mut options = fx.options();
    options.future_days = 1;
    let (_, outcome) = fx.run(options);
    assert_eq!(
        outcome,
        RunOutcome {
            extracted: false,
            generated: true
        }
    );
    // 2024-06-15 is now outside the window
    assert_eq!(fx.document(), format!("{}{}", CALENDAR_HEADER, CALENDAR_FOOTER));
}

#[test]
fn flag_change_reextracts() {
    let fx = Fixture::new();
    fx.deliver("1", EVT1);
    fx.run(fx.options());

    let mut options = fx.options();
    options.add_alarm = true;
    let (_, outcome) = fx.run(options);
    assert_eq!(
        outcome,
        RunOutcome {
            extracted: true,
            generated: true
        }
    );
    assert!(fx.document().contains("TRIGGER:-PT5M"));
}

#[test]
fn broken_utf8_flag_change_with_same_content_keeps_document() {
    let fx = Fixture::new();
    fx.deliver("1", EVT1);
    fx.run(fx.options());

    let mut options = fx.options();
    options.broken_utf8 = true;
    let (_, outcome) = fx.run(options);
    assert_eq!(
        outcome,
        RunOutcome {
            extracted: true,
            generated: false
        }
    );
}

#[test]
fn new_mail_triggers_extraction() {
    let fx = Fixture::new();
    fx.deliver("1", EVT1);
    fx.run(fx.options());

    fx.deliver(
        "2",
        "BEGIN:VEVENT\nUID:evt2\nDTSTAMP:20240101T000000Z\nDTSTART:20240620\nEND:VEVENT\n",
    );
    let (pipeline, outcome) = fx.run(fx.options());
    assert!(outcome.extracted && outcome.generated);
    assert!(pipeline.layout().events_dir().join("evt2").exists());
    assert!(fx.document().contains("UID:evt2"));
}

#[test]
fn force_rebuilds_everything() {
    let fx = Fixture::new();
    fx.deliver("1", EVT1);
    fx.run(fx.options());

    let mut options = fx.options();
    options.force = true;
    let (_, outcome) = fx.run(options);
    assert_eq!(
        outcome,
        RunOutcome {
            extracted: true,
            generated: true
        }
    );
}

#[test]
fn deleted_output_is_regenerated() {
    let fx = Fixture::new();
    fx.deliver("1", EVT1);
    fx.run(fx.options());

    std::fs::remove_file(fx.output()).unwrap();
    let (_, outcome) = fx.run(fx.options());
    assert_eq!(
        outcome,
        RunOutcome {
            extracted: false,
            generated: true
        }
    );
    assert!(fx.output().exists());
}

#[test]
fn damaged_index_forces_rebuild() {
    let fx = Fixture::new();
    fx.deliver("1", EVT1);
    let (pipeline, _) = fx.run(fx.options());

    let index_path = pipeline.layout().index_path();
    std::fs::write(&index_path, "evt1\tonly-two-fields\n").unwrap();

    let (_, outcome) = fx.run(fx.options());
    assert!(outcome.extracted);
    assert_eq!(
        std::fs::read_to_string(&index_path).unwrap(),
        "evt1\t20240615T090000Z\t20240615T100000Z\n"
    );
}

#[test]
fn newest_version_of_an_event_wins_across_mails() {
    let update = EVT1
        .replace("DTSTAMP:20240101T000000Z", "DTSTAMP:20240201T000000Z")
        .replace("DTSTART:20240615T090000Z", "DTSTART:20240616T090000Z");

    // "a" sorts before "b", so the update is read first here
    let fx = Fixture::new();
    fx.deliver("a", &update);
    fx.deliver("b", EVT1);
    let (pipeline, _) = fx.run(fx.options());
    let stored = std::fs::read_to_string(pipeline.layout().events_dir().join("evt1")).unwrap();
    assert!(stored.contains("DTSTART:20240616T090000Z"));

    let fx = Fixture::new();
    fx.deliver("a", EVT1);
    fx.deliver("b", &update);
    let (pipeline, _) = fx.run(fx.options());
    let stored = std::fs::read_to_string(pipeline.layout().events_dir().join("evt1")).unwrap();
    assert!(stored.contains("DTSTART:20240616T090000Z"));
}

#[test]
fn recurring_event_stays_in_window() {
    let fx = Fixture::new();
    fx.deliver(
        "1",
        "BEGIN:VEVENT\nUID:weekly\nDTSTAMP:20230101T000000Z\nDTSTART;TZID=Europe/Berlin:20230102T090000\n\
DTEND;TZID=Europe/Berlin:20230102T100000\nRRULE:FREQ=WEEKLY\nEND:VEVENT\n",
    );
    fx.deliver(
        "2",
        "BEGIN:VEVENT\nUID:once\nDTSTAMP:20230101T000000Z\nDTSTART:20230102T090000Z\nEND:VEVENT\n",
    );

    fx.run(fx.options());
    let document = fx.document();
    assert!(document.contains("UID:weekly"));
    assert!(document.contains("DTSTART:20230102T080000Z"));
    assert!(!document.contains("UID:once"));
}

#[test]
fn mails_without_identity_or_calendar_are_skipped() {
    let fx = Fixture::new();
    fx.deliver(
        "1",
        "BEGIN:VEVENT\nDTSTAMP:20240101T000000Z\nDTSTART:20240615T090000Z\nEND:VEVENT\n",
    );
    std::fs::write(
        fx.maildir().join("new").join("plain"),
        "Subject: hello\r\n\r\nNo calendar here.\r\n",
    )
    .unwrap();

    let (pipeline, outcome) = fx.run(fx.options());
    assert!(outcome.generated);
    assert_eq!(
        std::fs::read_dir(pipeline.layout().events_dir())
            .unwrap()
            .count(),
        0
    );
    assert_eq!(fx.document(), format!("{}{}", CALENDAR_HEADER, CALENDAR_FOOTER));
}

#[test]
fn overlong_uid_does_not_abort_the_run() {
    let fx = Fixture::new();
    fx.deliver("1", EVT1);
    fx.deliver(
        "2",
        &format!(
            "BEGIN:VEVENT\nUID:{}\nDTSTAMP:20240101T000000Z\nDTSTART:20240616T090000Z\nEND:VEVENT\n",
            "x".repeat(300)
        ),
    );

    let (pipeline, outcome) = fx.run(fx.options());
    assert!(outcome.extracted && outcome.generated);
    assert_eq!(
        std::fs::read_dir(pipeline.layout().events_dir())
            .unwrap()
            .count(),
        2
    );
    let document = fx.document();
    assert!(document.contains("UID:evt1"));
    assert!(document.contains(&"x".repeat(300)));
}

#[test]
fn stdout_output_always_regenerates() {
    let fx = Fixture::new();
    fx.deliver("1", EVT1);

    let mut options = fx.options();
    options.output = OutputTarget::Stdout;
    let (_, first) = fx.run(options.clone());
    let (_, second) = fx.run(options);
    assert!(first.generated);
    assert_eq!(
        second,
        RunOutcome {
            extracted: false,
            generated: true
        }
    );
}

#[test]
fn changed_output_path_regenerates() {
    let fx = Fixture::new();
    fx.deliver("1", EVT1);

    let first = fx.dir.path().join("a.ics");
    let second = fx.dir.path().join("b.ics");

    let mut options = fx.options();
    options.output = OutputTarget::File(first.clone());
    fx.run(options.clone());
    assert!(first.exists());

    options.output = OutputTarget::File(second.clone());
    let (_, outcome) = fx.run(options);
    assert_eq!(
        outcome,
        RunOutcome {
            extracted: false,
            generated: true
        }
    );
    assert_eq!(
        std::fs::read_to_string(&second).unwrap(),
        std::fs::read_to_string(&first).unwrap()
    );
}

#[test]
fn tampered_store_is_rebuilt() {
    let fx = Fixture::new();
    fx.deliver("1", EVT1);
    fx.run(fx.options());

    let stored = fx.events_dir().join("evt1");
    std::fs::write(&stored, "garbage\n").unwrap();

    let (_, outcome) = fx.run(fx.options());
    assert!(outcome.extracted);
    assert_eq!(std::fs::read_to_string(&stored).unwrap(), EVT1);
}
