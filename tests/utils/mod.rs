use regex as rust_regex;
use relic::{Builder, Config, Regex};

/// Compile a given pattern on all relic engines. Return Some if it compiles
/// for all engines, or None if it fails to compile for all of them. Panics if
/// an inconcistency is detected.
pub fn compile_all(pattern: &str, config: &Config) -> Option<Vec<Regex>> {
    let pike_vm = Builder::new(pattern).config(config.clone()).pike_vm();
    let backtracker = Builder::new(pattern).config(config.clone()).backtracker();
    match (pike_vm, backtracker) {
        (Ok(pike_vm), Ok(backtracker)) => Some(vec![pike_vm, backtracker]),
        (Err(e1), Err(e2)) => {
            assert_eq!(e1, e2, "Engines disagree on the error for {pattern:?}");
            None
        }
        _ => panic!("Inconsistency detected for {pattern:?}"),
    }
}

fn reference(pattern: &str, config: &Config) -> Result<rust_regex::Regex, rust_regex::Error> {
    rust_regex::RegexBuilder::new(pattern)
        .case_insensitive(config.case_insensitive)
        .multi_line(config.multi_line)
        .dot_matches_new_line(config.dot_matches_new_line)
        .build()
}

/// Where the search following a match from `start` to `end` begins. An empty
/// match moves one char forward. Contrary to `find_iter` of rust-regex, an
/// empty match touching the previous one is still reported.
fn next_start(input: &str, start: usize, end: usize) -> usize {
    if start < end {
        end
    } else {
        end + input[end..].chars().next().map_or(1, char::len_utf8)
    }
}

/// Match a pattern agains a given input on all engines,
/// including rust-regex, and compare the result of both compilation and execution.
pub fn check_all_engines(pattern: &str, input: &str) {
    check_all_engines_with(pattern, input, &Config::default());
}

/// Same as [`check_all_engines`], with the flags of `config` applied to
/// every engine.
pub fn check_all_engines_with(pattern: &str, input: &str, config: &Config) {
    // Reference engine
    let rust = reference(pattern, config);
    let ours = compile_all(pattern, config);

    match (rust, ours) {
        (Ok(rust_re), Some(our_engines)) => {
            // find
            let rust_match = rust_re.find(input).map(|m| (m.start(), m.end()));
            for engine in &our_engines {
                let my_match = engine
                    .find(input)
                    .unwrap()
                    .map(|m| (m.start(), m.end()));
                assert_eq!(
                    my_match, rust_match,
                    "Mismatch for pattern {:?} input {:?} (find)",
                    pattern, input
                );
                assert_eq!(
                    engine.is_match(input).unwrap(),
                    rust_match.is_some(),
                    "Mismatch for pattern {:?} input {:?} (is_match)",
                    pattern,
                    input
                );
            }

            // find_all
            let mut rust_all = Vec::new();
            let mut start = 0;
            while start <= input.len() {
                let Some(m) = rust_re.find_at(input, start) else {
                    break;
                };
                rust_all.push((m.start(), m.end()));
                start = next_start(input, m.start(), m.end());
            }
            for engine in &our_engines {
                let my_all: Vec<_> = engine
                    .find_all(input)
                    .map(|m| m.unwrap())
                    .map(|m| (m.start(), m.end()))
                    .collect();
                assert_eq!(
                    my_all, rust_all,
                    "Mismatch for pattern {:?} input {:?} (find_all)",
                    pattern, input
                );
            }

            // find_captures
            let rust_caps = rust_re.captures(input);
            let rust_groups = rust_caps.as_ref().map(|caps| {
                (0..caps.len())
                    .map(|i| caps.get(i).map(|m| m.as_str()))
                    .collect::<Vec<_>>()
            });
            for engine in &our_engines {
                let my_caps = engine.find_captures(input).unwrap();
                let my_groups = my_caps.as_ref().map(|caps| {
                    caps.iter()
                        .map(|g| g.map(|g| g.as_str()))
                        .collect::<Vec<_>>()
                });
                assert_eq!(
                    my_groups, rust_groups,
                    "Mismatch for pattern {:?} input {:?} (find_captures)",
                    pattern, input
                );
            }

            // find_all_captures
            let mut rust_all_caps: Vec<Vec<Option<&str>>> = Vec::new();
            let mut start = 0;
            while start <= input.len() {
                let Some(caps) = rust_re.captures_at(input, start) else {
                    break;
                };
                rust_all_caps.push((0..caps.len()).map(|i| caps.get(i).map(|m| m.as_str())).collect());
                let m = caps.get(0).unwrap();
                start = next_start(input, m.start(), m.end());
            }
            for engine in &our_engines {
                let my_all_caps: Vec<Vec<Option<&str>>> = engine
                    .find_all_captures(input)
                    .map(|caps| caps.unwrap())
                    .map(|caps| {
                        (0..caps.group_len())
                            .map(|i| caps.get(i).map(|g| g.as_str()))
                            .collect()
                    })
                    .collect();
                assert_eq!(
                    my_all_caps, rust_all_caps,
                    "Mismatch for pattern {:?} input {:?} (find_all_captures)",
                    pattern, input
                );
            }
        }
        (Err(_), None) => {} // All failed, that's good
        (Ok(_), None) => panic!("Our engines failed to compile {pattern:?} but rust-regex succeeded"),
        (Err(e), Some(_)) => {
            panic!("rust-regex failed to compile {pattern:?} but our engines succeeded: {e}")
        }
    }
}

/// Asserts that every relic engine reports the same groups for `pattern` on
/// `input`.
pub fn check_engines_agree(pattern: &str, input: &str) {
    let Some(engines) = compile_all(pattern, &Config::default()) else {
        panic!("{pattern:?} does not compile");
    };
    let groups: Vec<_> = engines
        .iter()
        .map(|engine| {
            engine.find_captures(input).unwrap().map(|caps| {
                caps.iter()
                    .map(|g| g.map(|g| g.range()))
                    .collect::<Vec<_>>()
            })
        })
        .collect();
    for other in &groups[1..] {
        assert_eq!(
            &groups[0], other,
            "Engines disagree for pattern {:?} input {:?}",
            pattern, input
        );
    }
}
