//! End-to-end behavior of the engine on small reference circuits.
//!
//! Each test builds a netlist with `NetlistBuilder`, runs it through the
//! public `Simulator` API, and checks committed values or coverage.

use std::sync::Arc;

use strobe_ir::{
    BinaryOp, Edge, Expr, MatchArm, Netlist, NetlistBuilder, Polarity, SignalSpec, StructuralError,
    UnaryOp,
};
use strobe_sim::{
    ProcessIdentity, SimConfig, SimError, SimTime, Simulator, StatementCoverage, StopReason,
    ToggleCoverage, ToggleDirection,
};

// ---------------------------------------------------------------------------
// Reference circuits
// ---------------------------------------------------------------------------

/// A free-running 2-bit counter on rising edges of `clk`.
fn counter2() -> Netlist {
    let mut b = NetlistBuilder::new();
    let clk = b.add_signal(SignalSpec::new("clk", 1));
    let count = b.add_signal(SignalSpec::new("count", 2));
    let sync = b.domain("sync", clk, Edge::Posedge);
    b.sync(
        sync,
        "count_next",
        count,
        Expr::binary(BinaryOp::Add, Expr::signal(count), Expr::constant(1, 2)),
    );
    b.build().unwrap()
}

fn arm(pattern: &str, value: Expr) -> MatchArm {
    MatchArm {
        patterns: vec![pattern.parse().unwrap()],
        value,
    }
}

/// A priority selector: the lowest set bit of `sel` picks `a`, `b` or `c`.
fn pmux() -> Netlist {
    let mut b = NetlistBuilder::new();
    let sel = b.add_signal(SignalSpec::new("sel", 3));
    let a = b.add_signal(SignalSpec::new("a", 8).init(0xa1));
    let bb = b.add_signal(SignalSpec::new("b", 8).init(0xb2));
    let c = b.add_signal(SignalSpec::new("c", 8).init(0xc3));
    let y = b.add_signal(SignalSpec::new("y", 8));
    b.comb(
        "y_sel",
        y,
        Expr::matching(
            Expr::signal(sel),
            vec![
                arm("--1", Expr::signal(a)),
                arm("-1-", Expr::signal(bb)),
                arm("1--", Expr::signal(c)),
            ],
            Expr::constant(0, 8),
        ),
    );
    b.build().unwrap()
}

/// A single-inverter ring.
fn oscillator() -> Netlist {
    let mut b = NetlistBuilder::new();
    let osc = b.add_signal(SignalSpec::new("osc", 1));
    b.comb("osc_inv", osc, Expr::unary(UnaryOp::Not, Expr::signal(osc)));
    b.build().unwrap()
}

// ===========================================================================
// Toggle coverage
// ===========================================================================

#[test]
fn counter_toggles_over_sixteen_ticks() {
    let netlist = counter2();
    let sync = netlist.find_domain("sync").unwrap();
    let count = netlist.find_signal("count").unwrap();
    let mut sim = Simulator::new(netlist, SimConfig::default()).unwrap();
    sim.add_clock(sync, SimTime::from_ns(10)).unwrap();
    let toggles = sim.attach(ToggleCoverage::new()).unwrap();

    let result = sim.run(Some(16)).unwrap();
    assert_eq!(result.cycles, 16);
    assert_eq!(result.stop_reason, StopReason::CycleLimit);

    let toggles = sim.observer(toggles).unwrap().get_result();
    assert_eq!(toggles.count(count, 0, ToggleDirection::ZeroToOne), 8);
    assert_eq!(toggles.count(count, 0, ToggleDirection::OneToZero), 8);
    assert_eq!(toggles.count(count, 1, ToggleDirection::ZeroToOne), 4);
    assert_eq!(toggles.count(count, 1, ToggleDirection::OneToZero), 4);
    assert!(toggles.fully_toggled(count, 2));
}

#[test]
fn counter_bit1_toggles_every_second_tick() {
    let netlist = counter2();
    let sync = netlist.find_domain("sync").unwrap();
    let count = netlist.find_signal("count").unwrap();
    let mut sim = Simulator::new(netlist, SimConfig::default()).unwrap();
    sim.add_clock(sync, SimTime::from_ns(10)).unwrap();
    sim.add_testbench("sample", move |ctx| async move {
        let mut bit1 = Vec::new();
        for _ in 0..8 {
            ctx.wait_tick(sync).await;
            bit1.push(ctx.read(count).get(1));
        }
        assert_eq!(bit1, [false, true, true, false, false, true, true, false]);
        Ok(())
    })
    .unwrap();
    assert_eq!(sim.run(None).unwrap().stop_reason, StopReason::Completed);
}

// ===========================================================================
// Combinational selection
// ===========================================================================

#[test]
fn pmux_selects_by_priority() {
    let netlist = pmux();
    let sel = netlist.find_signal("sel").unwrap();
    let y = netlist.find_signal("y").unwrap();
    let mut sim = Simulator::new(netlist, SimConfig::default()).unwrap();
    sim.add_testbench("select", move |ctx| async move {
        for (value, expected) in [(0b001, 0xa1), (0b010, 0xb2), (0b100, 0xc3), (0b000, 0), (0b011, 0xa1)] {
            ctx.write_u64(sel, value);
            ctx.settle().await;
            assert_eq!(ctx.read_u64(y), expected, "sel = {value:03b}");
        }
        Ok(())
    })
    .unwrap();
    let result = sim.run(None).unwrap();
    assert_eq!(result.final_time, SimTime::ZERO);
    assert_eq!(result.cycles, 0);
}

#[test]
fn reads_before_settle_see_pre_write_values() {
    let netlist = pmux();
    let sel = netlist.find_signal("sel").unwrap();
    let y = netlist.find_signal("y").unwrap();
    let mut sim = Simulator::new(netlist, SimConfig::default()).unwrap();
    sim.add_testbench("stale", move |ctx| async move {
        ctx.write_u64(sel, 0b010);
        assert_eq!(ctx.read_u64(sel), 0);
        assert_eq!(ctx.read_u64(y), 0);
        ctx.settle().await;
        assert_eq!(ctx.read_u64(y), 0xb2);
        Ok(())
    })
    .unwrap();
    sim.run(None).unwrap();
}

// ===========================================================================
// Registered commit
// ===========================================================================

#[test]
fn swap_registers_commit_atomically() {
    let mut b = NetlistBuilder::new();
    let clk = b.add_signal(SignalSpec::new("clk", 1));
    let x = b.add_signal(SignalSpec::new("x", 4).init(3));
    let z = b.add_signal(SignalSpec::new("z", 4).init(9));
    let sync = b.domain("sync", clk, Edge::Posedge);
    b.sync(sync, "x_next", x, Expr::signal(z));
    b.sync(sync, "z_next", z, Expr::signal(x));
    let mut sim = Simulator::new(b.build().unwrap(), SimConfig::default()).unwrap();
    sim.add_clock(sync, SimTime::from_ns(10)).unwrap();
    sim.add_testbench("swap", move |ctx| async move {
        ctx.wait_tick(sync).await;
        assert_eq!((ctx.read_u64(x), ctx.read_u64(z)), (9, 3));
        ctx.wait_tick(sync).await;
        assert_eq!((ctx.read_u64(x), ctx.read_u64(z)), (3, 9));
        Ok(())
    })
    .unwrap();
    sim.run(None).unwrap();
}

#[test]
fn shift_register_moves_one_stage_per_edge() {
    let mut b = NetlistBuilder::new();
    let clk = b.add_signal(SignalSpec::new("clk", 1));
    let din = b.add_signal(SignalSpec::new("din", 1));
    let s0 = b.add_signal(SignalSpec::new("s0", 1));
    let s1 = b.add_signal(SignalSpec::new("s1", 1));
    let s2 = b.add_signal(SignalSpec::new("s2", 1));
    let sync = b.domain("sync", clk, Edge::Posedge);
    b.sync(sync, "s0_next", s0, Expr::signal(din));
    b.sync(sync, "s1_next", s1, Expr::signal(s0));
    b.sync(sync, "s2_next", s2, Expr::signal(s1));
    let mut sim = Simulator::new(b.build().unwrap(), SimConfig::default()).unwrap();
    sim.add_clock(sync, SimTime::from_ns(10)).unwrap();
    sim.add_testbench("shift", move |ctx| async move {
        ctx.write_u64(din, 1);
        ctx.wait_tick(sync).await;
        ctx.write_u64(din, 0);
        assert_eq!([ctx.read_u64(s0), ctx.read_u64(s1), ctx.read_u64(s2)], [1, 0, 0]);
        ctx.wait_tick(sync).await;
        assert_eq!([ctx.read_u64(s0), ctx.read_u64(s1), ctx.read_u64(s2)], [0, 1, 0]);
        ctx.wait_tick(sync).await;
        assert_eq!([ctx.read_u64(s0), ctx.read_u64(s1), ctx.read_u64(s2)], [0, 0, 1]);
        Ok(())
    })
    .unwrap();
    sim.run(None).unwrap();
}

#[test]
fn domains_sharing_an_edge_commit_together() {
    let mut b = NetlistBuilder::new();
    let clk = b.add_signal(SignalSpec::new("clk", 1));
    let p = b.add_signal(SignalSpec::new("p", 4).init(1));
    let q = b.add_signal(SignalSpec::new("q", 4).init(2));
    let left = b.domain("left", clk, Edge::Posedge);
    let right = b.domain("right", clk, Edge::Posedge);
    b.sync(left, "p_next", p, Expr::signal(q));
    b.sync(right, "q_next", q, Expr::signal(p));
    let mut sim = Simulator::new(b.build().unwrap(), SimConfig::default()).unwrap();
    sim.add_testbench("edge", move |ctx| async move {
        ctx.write_u64(clk, 1);
        ctx.settle().await;
        assert_eq!((ctx.read_u64(p), ctx.read_u64(q)), (2, 1));
        Ok(())
    })
    .unwrap();
    let result = sim.run(None).unwrap();
    assert_eq!(result.cycles, 1);
    assert_eq!(result.edges, 2);
}

#[test]
fn falling_edge_domain() {
    let mut b = NetlistBuilder::new();
    let clk = b.add_signal(SignalSpec::new("clk", 1));
    let n = b.add_signal(SignalSpec::new("n", 4));
    let neg = b.domain("neg", clk, Edge::Negedge);
    b.sync(
        neg,
        "n_next",
        n,
        Expr::binary(BinaryOp::Add, Expr::signal(n), Expr::constant(1, 4)),
    );
    let mut sim = Simulator::new(b.build().unwrap(), SimConfig::default()).unwrap();
    sim.add_clock(neg, SimTime::from_ns(10)).unwrap();
    sim.add_testbench("neg", move |ctx| async move {
        ctx.wait_tick(neg).await;
        assert_eq!(ctx.now(), SimTime::from_ns(10));
        assert_eq!(ctx.read_u64(n), 1);
        Ok(())
    })
    .unwrap();
    sim.run(None).unwrap();
}

// ===========================================================================
// Reset
// ===========================================================================

#[test]
fn reset_holds_registers_until_released() {
    let mut b = NetlistBuilder::new();
    let clk = b.add_signal(SignalSpec::new("clk", 1));
    let rst_n = b.add_signal(SignalSpec::new("rst_n", 1));
    let count = b.add_signal(SignalSpec::new("count", 4).init(5).reset(0));
    let shadow = b.add_signal(SignalSpec::new("shadow", 4).reset_less());
    let sync = b.domain_with_reset("sync", clk, Edge::Posedge, rst_n, Polarity::ActiveLow);
    b.sync(
        sync,
        "count_next",
        count,
        Expr::binary(BinaryOp::Add, Expr::signal(count), Expr::constant(1, 4)),
    );
    b.sync(sync, "shadow_next", shadow, Expr::signal(count));
    let mut sim = Simulator::new(b.build().unwrap(), SimConfig::default()).unwrap();
    sim.add_clock(sync, SimTime::from_ns(10)).unwrap();
    sim.add_testbench("reset", move |ctx| async move {
        assert_eq!(ctx.read_u64(count), 5);
        ctx.wait_tick(sync).await;
        // count takes its reset value; the reset-less shadow samples the old count.
        assert_eq!(ctx.read_u64(count), 0);
        assert_eq!(ctx.read_u64(shadow), 5);
        ctx.ticks(sync, 2).await;
        assert_eq!(ctx.read_u64(count), 0);
        assert_eq!(ctx.read_u64(shadow), 0);

        ctx.write_u64(rst_n, 1);
        ctx.ticks(sync, 3).await;
        assert_eq!(ctx.read_u64(count), 3);
        assert_eq!(ctx.read_u64(shadow), 2);

        ctx.write_u64(rst_n, 0);
        ctx.wait_tick(sync).await;
        assert_eq!(ctx.read_u64(count), 0);
        Ok(())
    })
    .unwrap();
    sim.run(None).unwrap();
}

// ===========================================================================
// Non-convergence
// ===========================================================================

#[test]
fn oscillator_rejected_statically() {
    match Simulator::new(oscillator(), SimConfig::default()) {
        Err(SimError::Structural(StructuralError::CombinationalLoop { signals })) => {
            assert_eq!(signals, vec!["osc".to_string()]);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected a combinational loop error"),
    }
}

#[test]
fn oscillator_hits_iteration_cap_at_runtime() {
    let config = SimConfig {
        static_loop_check: false,
        max_settle_iterations: 50,
        ..SimConfig::default()
    };
    let mut sim = Simulator::new(oscillator(), config).unwrap();
    let err = sim.run(None).unwrap_err();
    match err {
        SimError::Structural(StructuralError::NonConverging { iterations, signals }) => {
            assert_eq!(iterations, 50);
            assert_eq!(signals, vec!["osc".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn two_stage_ring_does_not_stabilize() {
    let mut b = NetlistBuilder::new();
    let p = b.add_signal(SignalSpec::new("p", 1));
    let q = b.add_signal(SignalSpec::new("q", 1));
    b.comb("p_eq", p, Expr::signal(q));
    b.comb("q_inv", q, Expr::unary(UnaryOp::Not, Expr::signal(p)));
    let netlist = b.build().unwrap();
    assert_eq!(netlist.combinational_loops().len(), 1);

    let config = SimConfig {
        static_loop_check: false,
        ..SimConfig::default()
    };
    let mut sim = Simulator::new(netlist, config).unwrap();
    assert!(matches!(
        sim.run(None),
        Err(SimError::Structural(StructuralError::NonConverging { iterations: 1_000, .. }))
    ));
}

// ===========================================================================
// Statement coverage
// ===========================================================================

#[test]
fn statement_hits_match_executions() {
    let netlist = counter2();
    let sync = netlist.find_domain("sync").unwrap();
    let stmt = netlist.find_statement("count_next").unwrap();
    let mut sim = Simulator::new(netlist, SimConfig::default()).unwrap();
    sim.add_clock(sync, SimTime::from_ns(4)).unwrap();
    let hits = sim.attach(StatementCoverage::new()).unwrap();
    sim.add_testbench("k", move |ctx| async move {
        ctx.ticks(sync, 11).await;
        Ok(())
    })
    .unwrap();
    sim.run(None).unwrap();
    assert_eq!(sim.observer(hits).unwrap().get_result().hits(stmt), 11);
}

#[test]
fn unexecuted_statement_reports_zero() {
    let mut b = NetlistBuilder::new();
    let clk = b.add_signal(SignalSpec::new("clk", 1));
    let idle_clk = b.add_signal(SignalSpec::new("idle_clk", 1));
    let q = b.add_signal(SignalSpec::new("q", 1));
    let r = b.add_signal(SignalSpec::new("r", 1));
    let sync = b.domain("sync", clk, Edge::Posedge);
    let idle = b.domain("idle", idle_clk, Edge::Posedge);
    b.sync(sync, "q_next", q, Expr::unary(UnaryOp::Not, Expr::signal(q)));
    b.sync(idle, "r_next", r, Expr::signal(q));
    let netlist = Arc::new(b.build().unwrap());
    let q_next = netlist.find_statement("q_next").unwrap();
    let r_next = netlist.find_statement("r_next").unwrap();

    let mut sim = Simulator::new(Arc::clone(&netlist), SimConfig::default()).unwrap();
    sim.add_clock(sync, SimTime::from_ns(10)).unwrap();
    let hits = sim.attach(StatementCoverage::new()).unwrap();
    sim.run(Some(3)).unwrap();

    let result = sim.observer(hits).unwrap().get_result();
    assert_eq!(result.hits(q_next), 3);
    assert_eq!(result.hits(r_next), 0);
    let report = result.report(&netlist);
    assert_eq!((report.covered, report.total), (1, 2));
}

#[test]
fn testbench_records_branch_statements() {
    let mut b = NetlistBuilder::new();
    let clk = b.add_signal(SignalSpec::new("clk", 1));
    let counter = b.add_signal(SignalSpec::new("counter", 3));
    let out = b.add_signal(SignalSpec::new("out", 1));
    let sync = b.domain("sync", clk, Edge::Posedge);
    b.sync(
        sync,
        "counter_next",
        counter,
        Expr::binary(BinaryOp::Add, Expr::signal(counter), Expr::constant(1, 3)),
    );
    b.comb(
        "out_eq",
        out,
        Expr::binary(BinaryOp::Eq, Expr::signal(counter), Expr::constant(0, 3)),
    );
    let if_zero = b.statement("if_counter_0");
    let else_nonzero = b.statement("else_counter_nonzero");
    let increment = b.statement("counter_increment");
    let netlist = Arc::new(b.build().unwrap());

    let mut sim = Simulator::new(Arc::clone(&netlist), SimConfig::default()).unwrap();
    sim.add_clock(sync, SimTime::from_ns(10)).unwrap();
    let hits = sim.attach(StatementCoverage::new()).unwrap();
    sim.add_testbench("bench", move |ctx| async move {
        for _ in 0..4 {
            if ctx.read_u64(counter) == 0 {
                ctx.record_statement_hit(if_zero);
            } else {
                ctx.record_statement_hit(else_nonzero);
            }
            ctx.record_statement_hit(ctx.find_statement("counter_increment").unwrap());
            ctx.wait_tick(sync).await;
        }
        Ok(())
    })
    .unwrap();
    sim.run(None).unwrap();

    let result = sim.observer(hits).unwrap().get_result();
    assert_eq!(result.hits(if_zero), 1);
    assert_eq!(result.hits(else_nonzero), 3);
    assert_eq!(result.hits(increment), 4);
    assert_eq!(result.hits(netlist.find_statement("counter_next").unwrap()), 4);
    let report = result.report(&netlist);
    assert_eq!((report.covered, report.total), (5, 5));
}

#[test]
fn comb_rule_runs_once_initially_and_once_per_input_change() {
    let netlist = pmux();
    let sel = netlist.find_signal("sel").unwrap();
    let stmt = netlist.find_statement("y_sel").unwrap();
    let mut sim = Simulator::new(netlist, SimConfig::default()).unwrap();
    let hits = sim.attach(StatementCoverage::new()).unwrap();
    sim.add_testbench("drive", move |ctx| async move {
        for value in [1, 2, 2, 4] {
            ctx.write_u64(sel, value);
            ctx.settle().await;
        }
        Ok(())
    })
    .unwrap();
    sim.run(None).unwrap();
    // The repeated write of 2 changes nothing and triggers no evaluation.
    assert_eq!(sim.observer(hits).unwrap().get_result().hits(stmt), 4);
}

// ===========================================================================
// Process scheduling
// ===========================================================================

#[test]
fn writes_of_one_step_commit_as_a_batch() {
    let mut b = NetlistBuilder::new();
    let a = b.add_signal(SignalSpec::new("a", 1));
    let c = b.add_signal(SignalSpec::new("c", 1));
    let y = b.add_signal(SignalSpec::new("y", 1));
    b.comb("y_xor", y, Expr::binary(BinaryOp::Xor, Expr::signal(a), Expr::signal(c)));
    let mut sim = Simulator::new(b.build().unwrap(), SimConfig::default()).unwrap();
    let toggles = sim.attach(ToggleCoverage::new()).unwrap();
    sim.add_testbench("pair", move |ctx| async move {
        ctx.write_u64(a, 1);
        ctx.write_u64(c, 1);
        ctx.settle().await;
        assert_eq!(ctx.read_u64(y), 0);
        Ok(())
    })
    .unwrap();
    sim.run(None).unwrap();
    let toggles = sim.observer(toggles).unwrap().get_result();
    assert_eq!(toggles.count(y, 0, ToggleDirection::ZeroToOne), 0);
    assert_eq!(toggles.count(a, 0, ToggleDirection::ZeroToOne), 1);
}

#[test]
fn sibling_testbenches_resume_in_registration_order() {
    let netlist = counter2();
    let sync = netlist.find_domain("sync").unwrap();
    let count = netlist.find_signal("count").unwrap();
    let log = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
    let mut sim = Simulator::new(netlist, SimConfig::default()).unwrap();
    sim.add_clock(sync, SimTime::from_ns(10)).unwrap();
    for name in ["first", "second"] {
        let log = std::rc::Rc::clone(&log);
        sim.add_testbench(name, move |ctx| async move {
            for _ in 0..2 {
                ctx.wait_tick(sync).await;
                log.borrow_mut().push((name, ctx.read_u64(count)));
            }
            Ok(())
        })
        .unwrap();
    }
    sim.run(None).unwrap();
    assert_eq!(
        *log.borrow(),
        vec![("first", 1), ("second", 1), ("first", 2), ("second", 2)]
    );
}

#[test]
fn delays_interleave_by_time() {
    let log = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
    let mut sim = Simulator::new(counter2(), SimConfig::default()).unwrap();
    for (name, step) in [("slow", 3u64), ("fast", 2u64)] {
        let log = std::rc::Rc::clone(&log);
        sim.add_testbench(name, move |ctx| async move {
            for _ in 0..2 {
                ctx.wait_delay(SimTime::from_ns(step)).await;
                log.borrow_mut().push((name, ctx.now().to_ns()));
            }
            Ok(())
        })
        .unwrap();
    }
    let result = sim.run(None).unwrap();
    assert_eq!(result.final_time, SimTime::from_ns(6));
    assert_eq!(
        *log.borrow(),
        vec![("fast", 2), ("slow", 3), ("fast", 4), ("slow", 6)]
    );
}

// ===========================================================================
// Faults
// ===========================================================================

#[test]
fn panicking_testbench_aborts_with_identity_and_time() {
    let netlist = counter2();
    let sync = netlist.find_domain("sync").unwrap();
    let count = netlist.find_signal("count").unwrap();
    let mut sim = Simulator::new(netlist, SimConfig::default()).unwrap();
    sim.add_clock(sync, SimTime::from_ns(10)).unwrap();
    let toggles = sim.attach(ToggleCoverage::new()).unwrap();
    sim.add_testbench("checker", move |ctx| async move {
        ctx.ticks(sync, 3).await;
        assert_eq!(ctx.read_u64(count), 0, "count mismatch");
        Ok(())
    })
    .unwrap();

    let err = sim.run(None).unwrap_err();
    let SimError::Process(e) = err else {
        panic!("expected a process error, got {err}");
    };
    assert_eq!(
        e.process,
        ProcessIdentity::Testbench {
            id: 1,
            name: "checker".into()
        }
    );
    assert_eq!(e.time, SimTime::from_ns(25));
    assert!(e.message.contains("count mismatch"));

    // Committed state and coverage survive the abort.
    assert_eq!(sim.signal_value(count).unwrap().to_u64(), Some(3));
    let toggles = sim.observer(toggles).unwrap().get_result();
    assert_eq!(toggles.count(count, 0, ToggleDirection::ZeroToOne), 2);
}

#[test]
fn too_wide_write_is_structural_error() {
    let netlist = counter2();
    let count = netlist.find_signal("count").unwrap();
    let mut sim = Simulator::new(netlist, SimConfig::default()).unwrap();
    sim.add_testbench("wide", move |ctx| async move {
        ctx.write_u64(count, 0b111);
        ctx.settle().await;
        Ok(())
    })
    .unwrap();
    match sim.run(None) {
        Err(SimError::Fault { process, time, source }) => {
            assert_eq!(
                process,
                ProcessIdentity::Testbench {
                    id: 0,
                    name: "wide".into()
                }
            );
            assert_eq!(time, SimTime::ZERO);
            match *source {
                SimError::Structural(StructuralError::ValueTooWide { signal, width, value }) => {
                    assert_eq!(signal, "count");
                    assert_eq!(width, 2);
                    assert_eq!(value, "111");
                }
                other => panic!("unexpected cause: {other:?}"),
            }
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(sim.signal_value(count).unwrap().to_u64(), Some(0));
}

#[test]
fn writing_a_comb_output_is_rejected() {
    let netlist = pmux();
    let y = netlist.find_signal("y").unwrap();
    let mut sim = Simulator::new(netlist, SimConfig::default()).unwrap();
    sim.add_testbench("force", move |ctx| async move {
        ctx.write_u64(y, 1);
        ctx.settle().await;
        Ok(())
    })
    .unwrap();
    let err = sim.run(None).unwrap_err();
    let SimError::Fault { process, time, .. } = &err else {
        panic!("expected a testbench fault, got {err}");
    };
    assert_eq!(
        *process,
        ProcessIdentity::Testbench {
            id: 0,
            name: "force".into()
        }
    );
    assert_eq!(*time, SimTime::ZERO);
    assert!(matches!(err.cause(), SimError::DrivenSignal { signal } if signal == "y"));
}

#[test]
fn late_invalid_write_reports_when_it_happened() {
    let netlist = counter2();
    let sync = netlist.find_domain("sync").unwrap();
    let count = netlist.find_signal("count").unwrap();
    let mut sim = Simulator::new(netlist, SimConfig::default()).unwrap();
    sim.add_clock(sync, SimTime::from_ns(10)).unwrap();
    sim.add_testbench("late", move |ctx| async move {
        ctx.ticks(sync, 2).await;
        ctx.write_u64(count, 0b100);
        ctx.settle().await;
        Ok(())
    })
    .unwrap();

    let err = sim.run(None).unwrap_err();
    let SimError::Fault { process, time, .. } = &err else {
        panic!("expected a testbench fault, got {err}");
    };
    assert_eq!(
        *process,
        ProcessIdentity::Testbench {
            id: 1,
            name: "late".into()
        }
    );
    assert_eq!(*time, SimTime::from_ns(15));
    assert!(matches!(
        err.cause(),
        SimError::Structural(StructuralError::ValueTooWide { width: 2, .. })
    ));
    assert!(err.to_string().starts_with("testbench 'late' (#1) faulted at 15 ns"));
    assert_eq!(sim.signal_value(count).unwrap().to_u64(), Some(2));
}

#[test]
fn waiting_on_an_unknown_domain_faults() {
    let netlist = counter2();
    let mut sim = Simulator::new(netlist, SimConfig::default()).unwrap();
    sim.add_testbench("lost", move |ctx| async move {
        ctx.wait_tick(strobe_ir::DomainId::from_raw(5)).await;
        Ok(())
    })
    .unwrap();
    let err = sim.run(None).unwrap_err();
    assert!(matches!(&err, SimError::Fault { time, .. } if *time == SimTime::ZERO));
    assert!(matches!(err.cause(), SimError::UnknownDomain(_)));
}

#[test]
fn wide_multiplication_faults_the_rule() {
    let mut b = NetlistBuilder::new();
    let a = b.add_signal(SignalSpec::new("a", 80));
    let y = b.add_signal(SignalSpec::new("y", 8));
    b.comb("y_mul", y, Expr::binary(BinaryOp::Mul, Expr::signal(a), Expr::signal(a)));
    let mut sim = Simulator::new(b.build().unwrap(), SimConfig::default()).unwrap();
    match sim.run(None) {
        Err(SimError::Process(e)) => {
            assert_eq!(
                e.process,
                ProcessIdentity::Combinational {
                    statement: "y_mul".into()
                }
            );
            assert_eq!(e.time, SimTime::ZERO);
        }
        other => panic!("unexpected: {other:?}"),
    }
}
