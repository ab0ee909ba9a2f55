// Tests for per-tick fixed-point resolution
#[cfg(test)]
mod tests {
    use crate::core::components::{behavior_fn, LeafBuilder, Part, PortSpec, StructureBuilder};
    use crate::core::error::SimError;
    use crate::core::execution::{ConcurrencyMode, Simulation, SimulationConfig};
    use crate::core::tests::{count, counter, pass_through};
    use crate::core::values::{Logic, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// stim -> a -> b -> c -> result, children declared in `order`
    fn chain(order: &[&str], calls: &Arc<AtomicUsize>, strategy: ConcurrencyMode) -> Part {
        let mut builder = StructureBuilder::new("top", "Chain")
            .strategy(strategy)
            .port(PortSpec::input("stim"))
            .unwrap()
            .port(PortSpec::output("result"))
            .unwrap();
        for id in order {
            builder = builder.add_part(pass_through(id, calls)).unwrap();
        }
        builder
            .wire("stim", "a.in")
            .unwrap()
            .wire("a.out", "b.in")
            .unwrap()
            .wire("b.out", "c.in")
            .unwrap()
            .wire("c.out", "result")
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_chain_settles_in_one_tick() {
        let calls = counter();
        let mut sim = Simulation::new(chain(&["a", "b", "c"], &calls, ConcurrencyMode::Sequential), SimulationConfig::default()).unwrap();
        sim.inject("stim", Logic::One).unwrap();
        sim.step().unwrap();

        assert_eq!(count(&calls), 3, "Each child should fire exactly once");
        assert_eq!(sim.peek("result").unwrap(), Some(Value::Logic(Logic::One)));
        assert!(sim.is_updated("result").unwrap());
    }

    #[test]
    fn test_reverse_declaration_needs_extra_passes() {
        let calls = counter();
        let config = SimulationConfig::new().with_max_passes(3);
        let mut sim = Simulation::new(chain(&["c", "b", "a"], &calls, ConcurrencyMode::Sequential), config).unwrap();
        sim.inject("stim", Logic::Zero).unwrap();
        sim.step().expect("Three passes are enough for three reversed children");

        assert_eq!(count(&calls), 3);
        assert_eq!(sim.peek("c.out").unwrap(), Some(Value::Logic(Logic::Zero)));
    }

    #[test]
    fn test_pass_bound_reports_non_termination() {
        let calls = counter();
        let config = SimulationConfig::new().with_max_passes(1);
        let mut sim = Simulation::new(chain(&["c", "b", "a"], &calls, ConcurrencyMode::Sequential), config).unwrap();
        sim.inject("stim", Logic::One).unwrap();

        let result = sim.step();
        assert!(
            matches!(result, Err(SimError::NonTermination { ref part, passes: 1 }) if part == "top"),
            "Expected NonTermination, got {:?}",
            result
        );
        assert_eq!(count(&calls), 1, "Only 'a' can fire in the first pass");
    }

    #[test]
    fn test_at_most_once_per_tick() {
        let calls = counter();
        let hits = Arc::clone(&calls);
        let listener = LeafBuilder::new("listener", "Listener")
            .port(PortSpec::input("a"))
            .port(PortSpec::input("b"))
            .build(behavior_fn(move |_ctx| {
                hits.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }))
            .unwrap();
        let relay_calls = counter();

        // listener is declared first: it fires on `b`, then becomes eligible
        // again when the relay drives `a` later in the same pass
        let top = StructureBuilder::new("top", "Fanout")
            .port(PortSpec::input("stim"))
            .unwrap()
            .add_part(listener)
            .unwrap()
            .add_part(pass_through("relay", &relay_calls))
            .unwrap()
            .wire("stim", "listener.b")
            .unwrap()
            .wire("stim", "relay.in")
            .unwrap()
            .wire("relay.out", "listener.a")
            .unwrap()
            .build()
            .unwrap();

        let mut sim = Simulation::new(top, SimulationConfig::default()).unwrap();
        sim.inject("stim", Logic::One).unwrap();
        sim.step().unwrap();
        assert_eq!(count(&calls), 1, "Listener must not fire twice in one tick");
        assert!(sim.is_updated("listener.a").unwrap());

        sim.step().unwrap();
        assert_eq!(count(&calls), 1, "Nothing changed, so nothing fires");
        assert_eq!(count(&relay_calls), 1);
    }

    #[test]
    fn test_fan_out_delivers_identical_values() {
        let calls = counter();
        let top = StructureBuilder::new("top", "Fanout")
            .port(PortSpec::input("stim"))
            .unwrap()
            .add_part(pass_through("driver", &calls))
            .unwrap()
            .add_part(pass_through("x", &calls))
            .unwrap()
            .add_part(pass_through("y", &calls))
            .unwrap()
            .add_part(pass_through("z", &calls))
            .unwrap()
            .wire("stim", "driver.in")
            .unwrap()
            .wire("driver.out", "x.in")
            .unwrap()
            .wire("driver.out", "y.in")
            .unwrap()
            .wire("driver.out", "z.in")
            .unwrap()
            .build()
            .unwrap();

        let mut sim = Simulation::new(top, SimulationConfig::default()).unwrap();
        sim.inject("stim", Logic::H).unwrap();
        sim.step().unwrap();
        for id in ["x", "y", "z"] {
            assert_eq!(
                sim.peek(&format!("{}.out", id)).unwrap(),
                Some(Value::Logic(Logic::H)),
                "Slave '{}' should receive the master's value",
                id
            );
        }
        assert_eq!(count(&calls), 4);
    }

    #[test]
    fn test_second_master_rejected() {
        let calls = counter();
        let result = StructureBuilder::new("top", "FanIn")
            .add_part(pass_through("a", &calls))
            .unwrap()
            .add_part(pass_through("b", &calls))
            .unwrap()
            .add_part(pass_through("c", &calls))
            .unwrap()
            .wire("a.out", "c.in")
            .unwrap()
            .wire("b.out", "c.in");
        assert!(matches!(result, Err(SimError::MultipleDrivers { .. })));
    }

    #[test]
    fn test_overwrite_aborts_tick_and_keeps_first_value() {
        let calls = counter();
        let top = StructureBuilder::new("top", "Overwrite")
            .port(PortSpec::input("stim"))
            .unwrap()
            .add_part(pass_through("driver", &calls))
            .unwrap()
            .add_part(pass_through("sink", &calls))
            .unwrap()
            .wire("stim", "driver.in")
            .unwrap()
            .wire("driver.out", "sink.in")
            .unwrap()
            .build()
            .unwrap();

        let mut sim = Simulation::new(top, SimulationConfig::default()).unwrap();
        sim.inject("stim", Logic::One).unwrap();
        // stimulus written straight into a port that propagation will also drive
        sim.inject("sink.in", Logic::Zero).unwrap();

        let result = sim.step();
        assert!(
            matches!(result, Err(SimError::Overwrite { ref part, ref port }) if part == "sink" && port == "in"),
            "Expected OverwriteError, got {:?}",
            result
        );
        assert_eq!(
            sim.peek("sink.in").unwrap(),
            Some(Value::Logic(Logic::Zero)),
            "First written value must stay intact"
        );
    }

    #[test]
    fn test_nested_structure_forwards_ports() {
        let calls = counter();
        let inner = StructureBuilder::new("inner", "Inner")
            .port(PortSpec::input("in"))
            .unwrap()
            .port(PortSpec::output("out"))
            .unwrap()
            .add_part(pass_through("p", &calls))
            .unwrap()
            .wire("in", "p.in")
            .unwrap()
            .wire("p.out", "out")
            .unwrap()
            .build()
            .unwrap();
        let top = StructureBuilder::new("top", "Outer")
            .port(PortSpec::input("stim"))
            .unwrap()
            .add_part(inner)
            .unwrap()
            .add_part(pass_through("after", &calls))
            .unwrap()
            .wire("stim", "inner.in")
            .unwrap()
            .wire("inner.out", "after.in")
            .unwrap()
            .build()
            .unwrap();

        let mut sim = Simulation::new(top, SimulationConfig::default()).unwrap();
        sim.inject("stim", Logic::L).unwrap();
        sim.step().unwrap();
        assert_eq!(sim.peek("inner.p.out").unwrap(), Some(Value::Logic(Logic::L)));
        assert_eq!(sim.peek("after.out").unwrap(), Some(Value::Logic(Logic::L)));
        assert_eq!(count(&calls), 2);
    }

    #[test]
    fn test_rayon_matches_sequential() {
        let sequential_calls = counter();
        let parallel_calls = counter();
        let mut sequential = Simulation::new(
            chain(&["a", "b", "c"], &sequential_calls, ConcurrencyMode::Sequential),
            SimulationConfig::default(),
        )
        .unwrap();
        let mut parallel = Simulation::new(
            chain(&["a", "b", "c"], &parallel_calls, ConcurrencyMode::Sequential),
            SimulationConfig::new()
                .with_concurrency(ConcurrencyMode::Rayon)
                .with_thread_pool_size(2),
        )
        .unwrap();
        assert_eq!(parallel.top().strategy(), Some(ConcurrencyMode::Rayon));

        for sim in [&mut sequential, &mut parallel] {
            sim.watch("result").unwrap();
            sim.watch("b.out").unwrap();
        }
        for value in [Logic::One, Logic::Zero, Logic::Zero, Logic::One] {
            sequential.inject("stim", value).unwrap();
            parallel.inject("stim", value).unwrap();
            sequential.step().unwrap();
            parallel.step().unwrap();
        }
        assert_eq!(sequential.observations(), parallel.observations());
        assert_eq!(count(&sequential_calls), count(&parallel_calls));
    }

    #[test]
    fn test_rayon_rejects_wiring_cycle() {
        let calls = counter();
        let top = StructureBuilder::new("top", "Loop")
            .strategy(ConcurrencyMode::Rayon)
            .add_part(pass_through("a", &calls))
            .unwrap()
            .add_part(pass_through("b", &calls))
            .unwrap()
            .wire("a.out", "b.in")
            .unwrap()
            .wire("b.out", "a.in")
            .unwrap()
            .build()
            .unwrap();
        let mut sim = Simulation::new(top, SimulationConfig::default()).unwrap();
        assert!(matches!(sim.init(), Err(SimError::DependencyCycle(_))));
    }

    #[test]
    fn test_sequential_allows_feedback_loop() {
        let calls = counter();
        let head = LeafBuilder::new("head", "Head")
            .port(PortSpec::input("kick"))
            .port(PortSpec::input("feedback"))
            .port(PortSpec::output("out"))
            .build(behavior_fn(|ctx| {
                if ctx.is_updated("kick")? {
                    let value = ctx.read_logic("kick")?;
                    ctx.write("out", value)?;
                }
                Ok(())
            }))
            .unwrap();
        let top = StructureBuilder::new("top", "Loop")
            .port(PortSpec::input("stim"))
            .unwrap()
            .add_part(head)
            .unwrap()
            .add_part(pass_through("tail", &calls))
            .unwrap()
            .wire("stim", "head.kick")
            .unwrap()
            .wire("head.out", "tail.in")
            .unwrap()
            .wire("tail.out", "head.feedback")
            .unwrap()
            .build()
            .unwrap();

        let mut sim = Simulation::new(top, SimulationConfig::default()).unwrap();
        sim.inject("stim", Logic::One).unwrap();
        sim.step().expect("Feedback settles because each part fires once");
        assert_eq!(sim.peek("head.feedback").unwrap(), Some(Value::Logic(Logic::One)));
        assert_eq!(count(&calls), 1);
    }
}
