//! Test harness for running fixture cases with stochastic variations

use std::ops::ControlFlow;

use crate::common::{Gen, TestCase};
use otf_core::{DecodeHandler, DispatchIndex, ErrorEvent, Field, Group, GroupEvent, Ir, Listener};

/// Result of running a test
#[derive(Debug)]
pub struct TestResult {
    pub passed: bool,
    pub input: Vec<u8>,
    pub expected: Vec<String>,
    pub actual: Vec<String>,
    pub seed: u64,
    pub errors: Vec<String>,
}

/// Records every event as a compact line.
#[derive(Debug, Default)]
pub struct EventLog {
    pub lines: Vec<String>,
}

impl EventLog {
    fn format_field(field: &Field<'_>) -> String {
        let tag = if field.is_header() { "Header" } else { "Field" };
        let value = if field.encoding_count() == 1 {
            field.value().map(|v| v.to_string()).unwrap_or_else(|e| format!("<{}>", e.kind_name()))
        } else {
            let members: Vec<String> = field
                .encodings()
                .map(|(token, value)| match value {
                    Ok(v) => format!("{}={}", token.name, v),
                    Err(e) => format!("{}=<{}>", token.name, e.kind_name()),
                })
                .collect();
            format!("{{{}}}", members.join(","))
        };
        format!("{} {}={}", tag, field.name(), value)
    }
}

impl DecodeHandler for EventLog {
    fn on_field(&mut self, field: &Field<'_>) -> ControlFlow<()> {
        self.lines.push(Self::format_field(field));
        ControlFlow::Continue(())
    }

    fn on_group(&mut self, group: &Group<'_>) -> ControlFlow<()> {
        let edge = match group.event() {
            GroupEvent::Start => "GroupStart",
            GroupEvent::End => "GroupEnd",
        };
        self.lines.push(format!("{} {} {}", edge, group.name(), group.iteration()));
        ControlFlow::Continue(())
    }

    fn on_error(&mut self, error: &ErrorEvent<'_>) -> ControlFlow<()> {
        self.lines.push(format!("Error {}", error.error().kind_name()));
        ControlFlow::Continue(())
    }

    fn on_completed(&mut self) -> ControlFlow<()> {
        self.lines.push("Completed".to_string());
        ControlFlow::Continue(())
    }
}

/// Decode `input[start..length]` per the case's dispatch settings.
///
/// Setup errors (index build, dispatch) show up as a single `Error` line.
pub fn collect_events(case: &TestCase, input: &[u8], start: usize, length: usize) -> Vec<String> {
    let ir = case.ir();
    let header: Ir = case.header_ir();
    let index = match DispatchIndex::build(&ir) {
        Ok(index) => index,
        Err(e) => return vec![format!("Error {}", e.kind_name())],
    };

    let mut listener = Listener::new(&ir, &index);
    let dispatched = match (&case.discriminator, case.template) {
        (Some(discriminator), _) => listener.dispatch_message_by_header(&header, discriminator).map(|_| ()),
        (None, Some(template)) => listener.dispatch_message(template).map(|_| ()),
        (None, None) => panic!("fixture {} names neither discriminator nor template", case.id),
    };
    if let Err(e) = dispatched {
        return vec![format!("Error {}", e.kind_name())];
    }

    let mut log = EventLog::default();
    listener.reset_for_decode_at(input, length, start);
    listener.decode(&mut log);
    log.lines
}

fn compare(expected: &[String], actual: &[String]) -> Vec<String> {
    let mut errors = Vec::new();

    if actual.len() != expected.len() {
        errors.push(format!(
            "Event count mismatch: expected {}, got {}",
            expected.len(),
            actual.len()
        ));
    }

    for (i, (act, exp)) in actual.iter().zip(expected.iter()).enumerate() {
        if act != exp {
            errors.push(format!("Event {}: expected '{}', got '{}'", i, exp, act));
        }
    }
    errors
}

/// Run a single test case (canonical, no variations)
pub fn run_test(case: &TestCase) -> TestResult {
    let input = case.bytes();
    let length = case.length.unwrap_or(input.len());
    let actual = collect_events(case, &input, 0, length);
    let errors = compare(&case.events, &actual);

    TestResult {
        passed: errors.is_empty(),
        input,
        expected: case.events.clone(),
        actual,
        seed: 0,
        errors,
    }
}

/// Run test with stochastic variations
///
/// Applies independent variations:
/// - random junk before the message (walk anchored past it)
/// - random trailing bytes, for cases expected to complete
/// - a second decode on the same input, which must match the first
pub fn run_with_variations(case: &TestCase, gen: &mut Gen) -> TestResult {
    let canonical = case.bytes();
    let prefix_len = if gen.chance(0.5) { gen.geometric(0.8) * 3 } else { 0 };

    let mut input = gen.bytes(prefix_len);
    input.extend_from_slice(&canonical);
    let length = prefix_len + case.length.unwrap_or(canonical.len());
    if case.expects_completion() && case.length.is_none() && gen.chance(0.5) {
        let suffix_len = 1 + gen.geometric(0.7);
        input.extend(gen.bytes(suffix_len));
    }
    let length = if case.length.is_none() { input.len() } else { length };

    let actual = collect_events(case, &input, prefix_len, length);
    let mut errors = compare(&case.events, &actual);

    let again = collect_events(case, &input, prefix_len, length);
    if again != actual {
        errors.push("Second decode of the same buffer produced different events".to_string());
    }

    TestResult {
        passed: errors.is_empty(),
        input,
        expected: case.events.clone(),
        actual,
        seed: gen.seed,
        errors,
    }
}

impl TestResult {
    /// Print detailed failure info
    pub fn print_failure(&self, case_id: &str) {
        eprintln!("\n=== FAILED: {} ===", case_id);
        eprintln!("Seed: {} (set OTF_TEST_SEED={} to reproduce)", self.seed, self.seed);
        eprintln!("\nInput ({} bytes):", self.input.len());
        eprintln!("{:02x?}", self.input);
        eprintln!("\nExpected events:");
        for (i, e) in self.expected.iter().enumerate() {
            eprintln!("  {}: {}", i, e);
        }
        eprintln!("\nActual events:");
        for (i, e) in self.actual.iter().enumerate() {
            eprintln!("  {}: {}", i, e);
        }
        eprintln!("\nErrors:");
        for e in &self.errors {
            eprintln!("  - {}", e);
        }
    }
}
