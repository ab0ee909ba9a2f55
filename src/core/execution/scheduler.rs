//! Fixed-point resolution of a structural part's children within one tick.
//!
//! Every child fires at most once per tick. A pass visits the children and
//! fires each unfired eligible one, propagating its outputs right away.
//! Passes repeat until one fires nothing. Passes that fire something are
//! bounded by `max_passes`; running out with an eligible child left unfired
//! is a `NonTermination` error.

use crate::core::components::part::{Part, Structure, TickContext};
use crate::core::components::port_specs::Direction;
use crate::core::components::ports::PortSet;
use crate::core::connections::{ConnectionManager, Endpoint};
use crate::core::error::{Result, SimError};
use crate::core::execution::config::ConcurrencyMode;
use crate::core::values::Value;
use log::debug;
use rayon::prelude::*;

pub(crate) fn resolve(
    id: &str,
    ports: &mut PortSet,
    structure: &mut Structure,
    ctx: &TickContext<'_>,
) -> Result<()> {
    propagate_own_inputs(ports, structure)?;
    match structure.strategy {
        ConcurrencyMode::Sequential => resolve_sequential(id, ports, structure, ctx),
        ConcurrencyMode::Rayon => resolve_parallel(id, ports, structure, ctx),
    }
}

fn resolve_sequential(
    id: &str,
    ports: &mut PortSet,
    structure: &mut Structure,
    ctx: &TickContext<'_>,
) -> Result<()> {
    let count = structure.children.len();
    let mut fired = vec![false; count];
    let mut passes = 0;

    loop {
        let mut fired_this_pass = 0;
        for index in 0..count {
            if fired[index] || !structure.children[index].is_eligible() {
                continue;
            }
            structure.children[index].run(ctx)?;
            fired[index] = true;
            fired_this_pass += 1;
            propagate_child_outputs(index, ports, structure)?;
        }

        if fired_this_pass == 0 {
            break;
        }
        passes += 1;
        debug!("[{}] '{}' pass {} fired {} part(s)", ctx.tick, id, passes, fired_this_pass);
        if passes >= ctx.max_passes {
            return check_settled(id, &fired, &structure.children, passes);
        }
    }
    Ok(())
}

fn resolve_parallel(
    id: &str,
    ports: &mut PortSet,
    structure: &mut Structure,
    ctx: &TickContext<'_>,
) -> Result<()> {
    let count = structure.children.len();
    if structure.stages.iter().map(Vec::len).sum::<usize>() != count {
        structure.build_stages()?;
    }
    let stages = structure.stages.clone();
    let mut fired = vec![false; count];
    let mut passes = 0;

    loop {
        let mut fired_this_pass = 0;
        for stage in &stages {
            let mut selected = vec![false; count];
            for &index in stage {
                selected[index] = !fired[index] && structure.children[index].is_eligible();
            }
            if !selected.iter().any(|s| *s) {
                continue;
            }

            structure
                .children
                .par_iter_mut()
                .enumerate()
                .filter(|(index, _)| selected[*index])
                .try_for_each(|(_, child)| child.run(ctx))?;

            for &index in stage {
                if selected[index] {
                    fired[index] = true;
                    fired_this_pass += 1;
                    propagate_child_outputs(index, ports, structure)?;
                }
            }
        }

        if fired_this_pass == 0 {
            break;
        }
        passes += 1;
        debug!("[{}] '{}' pass {} fired {} part(s) in parallel", ctx.tick, id, passes, fired_this_pass);
        if passes >= ctx.max_passes {
            return check_settled(id, &fired, &structure.children, passes);
        }
    }
    Ok(())
}

fn check_settled(id: &str, fired: &[bool], children: &[Part], passes: usize) -> Result<()> {
    let pending = children
        .iter()
        .enumerate()
        .any(|(index, child)| !fired[index] && child.is_eligible());
    if pending {
        return Err(SimError::NonTermination {
            part: id.to_string(),
            passes,
        });
    }
    Ok(())
}

/// Forward values injected into or propagated onto the structural part's own inputs
fn propagate_own_inputs(ports: &mut PortSet, structure: &mut Structure) -> Result<()> {
    for (port, value) in ports.take_dirty(Direction::Input) {
        deliver(Endpoint::Own { port }, value, ports, structure)?;
    }
    Ok(())
}

fn propagate_child_outputs(index: usize, ports: &mut PortSet, structure: &mut Structure) -> Result<()> {
    let outputs = structure.children[index].ports.take_dirty(Direction::Output);
    for (port, value) in outputs {
        deliver(Endpoint::Child { part: index, port }, value, ports, structure)?;
    }
    Ok(())
}

/// Copy `value` to every slave of `source`
fn deliver(source: Endpoint, value: Value, ports: &mut PortSet, structure: &mut Structure) -> Result<()> {
    let targets: Vec<Endpoint> = targets(&structure.wiring, source);
    for target in targets {
        match target {
            Endpoint::Own { port } => ports.receive(port, value)?,
            Endpoint::Child { part, port } => structure.children[part].ports.receive(port, value)?,
        }
    }
    Ok(())
}

fn targets(wiring: &ConnectionManager, source: Endpoint) -> Vec<Endpoint> {
    wiring.targets_of(source).collect()
}
