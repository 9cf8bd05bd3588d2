//! Property tests for surface tree liveness.
//!
//! A toplevel with a small fixed family of sub-surfaces is mapped,
//! unmapped, detached and re-attached in random order. After every step
//! the set of surfaces with a live tree node must be exactly the mapped
//! surfaces whose whole ancestry is mapped and still attached.

use std::collections::HashSet;

use proptest::prelude::*;

use planar_core::config::Config;
use planar_core::event::CoreEvent;
use planar_core::surface::Placement;
use planar_core::{Core, Geometry, SubsurfaceId, SurfaceId};

/// Parent index of each surface, `None` for the toplevel root.
const PARENTS: [Option<usize>; 5] = [None, Some(0), Some(1), Some(0), Some(3)];

#[derive(Debug, Clone, Copy)]
enum Op {
    Map(usize),
    Unmap(usize),
    Detach(usize),
    Attach(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..PARENTS.len()).prop_map(Op::Map),
        (0..PARENTS.len()).prop_map(Op::Unmap),
        (1..PARENTS.len()).prop_map(Op::Detach),
        (1..PARENTS.len()).prop_map(Op::Attach),
    ]
}

/// Create the sub-surface relation of surface `i` to its fixed parent.
fn attach(core: &mut Core, surfaces: &[SurfaceId], i: usize) -> Option<SubsurfaceId> {
    let parent = PARENTS[i]?;
    let id = core.next_subsurface_id();
    core.handle_event(CoreEvent::SubsurfaceCreated {
        id,
        surface: surfaces[i],
        parent: surfaces[parent],
        placement: if i % 2 == 0 {
            Placement::Below
        } else {
            Placement::Above
        },
        x: 0,
        y: 0,
    });
    Some(id)
}

fn setup() -> (Core, Vec<SurfaceId>, Vec<Option<SubsurfaceId>>) {
    let mut core = Core::new(Config::default());
    let output = core.next_output_id();
    core.handle_event(CoreEvent::OutputAdded {
        id: output,
        name: "prop".into(),
        geometry: Geometry::new(0, 0, 800, 600),
        scale: 1.0,
    });

    let surfaces: Vec<_> = PARENTS.iter().map(|_| core.next_surface_id()).collect();
    for &id in &surfaces {
        core.handle_event(CoreEvent::SurfaceCreated { id });
    }

    let toplevel = core.next_toplevel_id();
    core.handle_event(CoreEvent::ToplevelCreated {
        id: toplevel,
        surface: surfaces[0],
        app_id: None,
        title: None,
    });

    let relations = (0..PARENTS.len())
        .map(|i| attach(&mut core, &surfaces, i))
        .collect();
    (core, surfaces, relations)
}

fn expected_live(mapped: &[bool], attached: &[bool]) -> HashSet<usize> {
    (0..PARENTS.len())
        .filter(|&i| {
            let mut at = Some(i);
            while let Some(j) = at {
                if !mapped[j] {
                    return false;
                }
                at = match PARENTS[j] {
                    Some(_) if !attached[j] => return false,
                    parent => parent,
                };
            }
            true
        })
        .collect()
}

proptest! {
    #[test]
    fn live_nodes_match_mapped_ancestry(ops in prop::collection::vec(op(), 1..40)) {
        let (mut core, surfaces, mut relations) = setup();
        let mut mapped = vec![false; PARENTS.len()];

        for op in ops {
            match op {
                Op::Map(i) => {
                    core.handle_event(CoreEvent::SurfaceMapped { id: surfaces[i] });
                    mapped[i] = true;
                }
                Op::Unmap(i) => {
                    core.handle_event(CoreEvent::SurfaceUnmapped { id: surfaces[i] });
                    mapped[i] = false;
                }
                Op::Detach(i) => {
                    if let Some(id) = relations[i].take() {
                        core.handle_event(CoreEvent::SubsurfaceDestroyed { id });
                    }
                }
                Op::Attach(i) => {
                    if relations[i].is_none() {
                        relations[i] = attach(&mut core, &surfaces, i);
                    }
                }
            }

            let attached: Vec<_> = relations.iter().map(Option::is_some).collect();
            let live: HashSet<_> = expected_live(&mapped, &attached)
                .into_iter()
                .map(|i| surfaces[i])
                .collect();
            prop_assert_eq!(core.state.forest.live_surfaces(), live);
            prop_assert!(core.state.validate_invariants().is_ok());
        }
    }
}
