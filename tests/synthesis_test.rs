// This test suite exercises whole synthesis requests against the bundled 8085 catalog. It
// covers the loopless path (a window reachable by straight-line code within the budget),
// single wide and narrow loops, the spiller freeing registers through memory and through
// the stack, and the infeasible cases: a single register facing a window far beyond its
// nesting range, and an empty resource list facing a window that needs a loop. Every
// produced routine is checked against the requested window and its listing against its
// instruction count.

//! End-to-end delay synthesis tests.

use delaygen::codegen::count_instruction_lines;
use delaygen::{
    DelayFunction, DelayFunctionBuilder, DelayRequest, Executable, InstructionCatalog, Resource,
    Target, TargetRegistry,
};

fn catalog() -> InstructionCatalog {
    let registry = TargetRegistry::with_builtin();
    let target = registry.get("8085").unwrap();
    InstructionCatalog::parse(target.bundled_catalog()).unwrap()
}

fn build(catalog: &InstructionCatalog, request: &DelayRequest) -> Option<DelayFunction> {
    let _ = env_logger::builder().is_test(true).try_init();
    let builder = DelayFunctionBuilder::new(catalog, &delaygen::i8085::I8085);
    let routine = builder.build(request).unwrap();
    if let Some(routine) = &routine {
        let d = routine.duration() as i64;
        assert!(request.min <= d && d <= request.max, "duration {} outside window", d);
        assert_eq!(count_instruction_lines(&routine.render()), routine.length());
    }
    routine
}

fn registers(letters: &str) -> Vec<Resource> {
    letters
        .chars()
        .map(|c| Resource::register(c.to_string()))
        .collect()
}

#[test]
fn test_loopless_routine_for_short_window() {
    let catalog = catalog();
    let request = DelayRequest::new(50, 60, registers("ABC"), 10);
    let routine = build(&catalog, &request).unwrap();

    assert!(matches!(routine.main, Executable::Group(_)));
    assert_eq!(routine.duration(), 50);
    assert!(routine.length() <= 10);
    assert!(routine.init.is_empty());
    assert!(routine.render().ends_with("\tRET\n"));
}

#[test]
fn test_single_register_far_window_is_infeasible() {
    let catalog = catalog();
    let request = DelayRequest::new(100_000_000, 100_000_010, registers("A"), 5);
    assert!(build(&catalog, &request).is_none());
}

#[test]
fn test_empty_resources_terminate_without_result() {
    let catalog = catalog();
    let request = DelayRequest::new(5_000, 5_100, Vec::new(), 10);
    assert!(build(&catalog, &request).is_none());
}

#[test]
fn test_wide_loop_on_register_pair() {
    let catalog = catalog();
    let request = DelayRequest::new(10_000, 10_010, registers("BC"), 10);
    let routine = build(&catalog, &request).unwrap();

    match &routine.main {
        Executable::Loop(l) => {
            assert_eq!(l.init.render(), format!("LXI B,{}", l.iterations));
            assert_eq!(l.condition.render(), "JNZ loop0");
        }
        other => panic!("expected a loop, got {:?}", other),
    }
    assert!(routine.render().contains("loop0:\n"));
}

#[test]
fn test_narrow_loop_on_single_register() {
    let catalog = catalog();
    let request = DelayRequest::new(2_000, 2_020, registers("D"), 10);
    let routine = build(&catalog, &request).unwrap();
    match &routine.main {
        Executable::Loop(l) => {
            assert!(l.init.render().starts_with("MVI D,"));
            assert!(l.iterations >= 2 && l.iterations <= 255);
        }
        other => panic!("expected a loop, got {:?}", other),
    }
}

#[test]
fn test_memory_spill_saves_and_restores_register() {
    let catalog = catalog();
    let mut resources = registers("A");
    resources.push(Resource::memory("2000H"));
    resources.push(Resource::memory("2001H"));
    let request = DelayRequest::new(1_000_000, 1_000_100, resources, 10);
    let routine = build(&catalog, &request).unwrap();

    let listing = routine.render();
    assert!(listing.starts_with("\tMOV A,B\n\tSTA 2000H\n"));
    assert!(listing.ends_with("\tLDA 2000H\n\tMOV B,A\n\tRET\n"));
}

#[test]
fn test_two_byte_store_needs_adjacent_locations() {
    let catalog = catalog();
    let distant = vec![Resource::memory("2000H"), Resource::memory("3000H")];
    let routine = build(&catalog, &DelayRequest::new(26, 26, distant, 2)).unwrap();
    let listing = routine.render();
    assert!(!listing.contains("SHLD") && !listing.contains("LHLD"), "{}", listing);

    let adjacent = vec![Resource::memory("2001H"), Resource::memory("2000H")];
    let routine = build(&catalog, &DelayRequest::new(26, 26, adjacent, 2)).unwrap();
    assert_eq!(routine.render(), "\tSHLD 2000H\n\tRET\n");
}

#[test]
fn test_stack_spill_pushes_and_pops_in_reverse() {
    let catalog = catalog();
    let request = DelayRequest::new(200_000, 200_100, vec![Resource::stack()], 10);
    let routine = build(&catalog, &request).unwrap();

    let listing = routine.render();
    assert!(listing.starts_with("\tPUSH PSW\n\tPUSH B\n"));
    assert!(listing.ends_with("\tPOP B\n\tPOP PSW\n\tRET\n"));
}

#[test]
fn test_no_state_between_requests() {
    let catalog = catalog();
    let builder = DelayFunctionBuilder::new(&catalog, &delaygen::i8085::I8085);
    let request = DelayRequest::new(10_000, 10_010, registers("BC"), 10);
    let first = builder.build(&request).unwrap();
    let second = builder.build(&request).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_statistics_are_collected() {
    let catalog = catalog();
    let builder = DelayFunctionBuilder::new(&catalog, &delaygen::i8085::I8085);
    let resources = vec![Resource::register("A"), Resource::stack()];
    let request = DelayRequest::new(1_000_000, 1_000_100, resources, 10);
    let (routine, stats) = builder.build_with_stats(&request).unwrap();
    assert!(routine.is_some());
    assert_eq!(stats.stack_spills, 1);
    assert!(stats.tables_computed > 0);
    assert!(stats.iteration_candidates > 0);
    assert!(stats.to_string().contains("Synthesis Statistics"));
}

#[test]
fn test_unknown_target_is_reported() {
    let registry = TargetRegistry::with_builtin();
    assert!(registry.get("6502").is_err());
    let target: &dyn Target = registry.get("I8085").unwrap();
    assert_eq!(target.id(), "8085");
}
