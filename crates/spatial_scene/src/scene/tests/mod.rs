//! Scene-level integration tests: scene graph, spatial index and scene
//! manager exercised together

mod index_equivalence;
mod quadtree_scenarios;
