use std::sync::{Arc, Mutex};

use narwhal::{
    Algorithm, Edge, GForce, GForceOptions, Graph, LayoutHooks, LayoutStatus, Node, Point,
    Selector,
};

fn star(leaves: usize) -> Graph {
    let mut nodes = vec![Node::new("hub")];
    let mut edges = Vec::new();
    for i in 0..leaves {
        nodes.push(Node::new(format!("leaf{i}")));
        edges.push(Edge::new("hub", format!("leaf{i}")));
    }
    Graph::new(nodes, edges)
}

fn centroid(g: &Graph) -> Point {
    let n = g.nodes.len() as f64;
    let (sx, sy) = g.nodes.iter().fold((0.0, 0.0), |(sx, sy), node| {
        let p = node.position().expect("laid out");
        (sx + p.x, sy + p.y)
    });
    Point::new(sx / n, sy / n)
}

#[test]
fn gforce_places_a_single_node_at_the_center() {
    let mut g = Graph::new(vec![Node::new("only")], Vec::new());
    let outcome = narwhal::layout(&mut g, Algorithm::GForce(GForceOptions::default())).unwrap();
    assert_eq!(outcome.status, LayoutStatus::Trivial);
    assert_eq!(outcome.iterations, 0);
    assert_eq!(g.nodes[0].position(), Some(Point::new(150.0, 150.0)));
}

#[test]
fn gforce_single_pinned_node_stays_on_its_pin() {
    let mut g = Graph::new(vec![Node::new("only").pinned_at(3.0, -4.0)], Vec::new());
    GForce::new(GForceOptions::default()).layout(&mut g).unwrap();
    assert_eq!(g.nodes[0].position(), Some(Point::new(3.0, -4.0)));
}

#[test]
fn gforce_empty_graph_is_trivial() {
    let mut g = Graph::default();
    let outcome = GForce::new(GForceOptions::default()).layout(&mut g).unwrap();
    assert_eq!(outcome.status, LayoutStatus::Trivial);
    assert!(g.nodes.is_empty());
}

#[test]
fn gforce_without_external_forces_keeps_the_centroid_every_step() {
    let drift = Arc::new(Mutex::new((0usize, 0.0_f64)));
    let sink = Arc::clone(&drift);
    let opts = GForceOptions {
        gravity: 0.0,
        prevent_overlap: false,
        max_iteration: 30,
        min_movement: 0.0,
        hooks: LayoutHooks::default().on_tick(move |_progress, nodes| {
            let (sx, sy, scale) = nodes.iter().filter_map(Node::position).fold(
                (0.0, 0.0, 1.0_f64),
                |(sx, sy, scale), p| (sx + p.x, sy + p.y, scale.max(p.x.abs()).max(p.y.abs())),
            );
            let n = nodes.len() as f64;
            let off = (sx / n).abs().max((sy / n).abs()) / scale;
            let mut drift = sink.lock().unwrap();
            drift.0 += 1;
            drift.1 = drift.1.max(off);
        }),
        ..Default::default()
    };
    let mut g = Graph::new(
        vec![
            Node::at("a", -50.0, -50.0),
            Node::at("b", 50.0, -50.0),
            Node::at("c", 50.0, 50.0),
            Node::at("d", -50.0, 50.0),
        ],
        vec![
            Edge::new("a", "b"),
            Edge::new("b", "c"),
            Edge::new("c", "d"),
            Edge::new("d", "a"),
        ],
    );
    GForce::new(opts).layout(&mut g).unwrap();

    let (ticks, worst) = *drift.lock().unwrap();
    assert_eq!(ticks, 30);
    assert!(worst < 1e-9, "centroid drifted by {worst} of the layout scale");
    let c = centroid(&g);
    assert!(c.x.abs() < 1e-6 && c.y.abs() < 1e-6, "{c:?}");
}

#[test]
fn gforce_movement_settles_over_the_run() {
    let movements = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&movements);
    let opts = GForceOptions {
        max_iteration: 200,
        hooks: LayoutHooks::default().on_tick(move |progress, _nodes| {
            sink.lock().unwrap().push(progress.movement);
        }),
        ..Default::default()
    };
    let mut g = star(6);
    GForce::new(opts).layout(&mut g).unwrap();

    let movements = movements.lock().unwrap();
    assert!(!movements.is_empty());
    let quarter = (movements.len() / 4).max(1);
    let mean = |xs: &[f64]| xs.iter().sum::<f64>() / xs.len() as f64;
    let first = mean(&movements[..quarter]);
    let last = mean(&movements[movements.len() - quarter..]);
    assert!(last <= first, "first quarter {first}, last quarter {last}");
}

#[test]
fn gforce_pinned_nodes_never_move() {
    let seen_off_pin = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&seen_off_pin);
    let opts = GForceOptions {
        max_iteration: 50,
        hooks: LayoutHooks::default().on_tick(move |_progress, nodes| {
            if nodes[0].position() != Some(Point::new(0.0, 0.0)) {
                *flag.lock().unwrap() = true;
            }
        }),
        ..Default::default()
    };
    let mut g = Graph::new(
        vec![
            Node::at("anchor", 0.0, 0.0).pinned_at(0.0, 0.0),
            Node::at("b", 20.0, 0.0),
            Node::at("c", 0.0, 20.0),
        ],
        vec![Edge::new("anchor", "b"), Edge::new("anchor", "c")],
    );
    GForce::new(opts).layout(&mut g).unwrap();

    assert!(!*seen_off_pin.lock().unwrap());
    assert_eq!(g.nodes[0].position(), Some(Point::new(0.0, 0.0)));
    assert_ne!(g.nodes[1].position(), Some(Point::new(20.0, 0.0)));
}

#[test]
fn gforce_star_hub_ends_closest_to_the_center() {
    let mut g = star(6);
    let opts = GForceOptions {
        center: Some(Point::new(0.0, 0.0)),
        max_iteration: 1000,
        min_movement: 0.0,
        ..Default::default()
    };
    let outcome = GForce::new(opts).layout(&mut g).unwrap();
    assert_eq!(outcome.status, LayoutStatus::IterationLimit);

    let origin = Point::new(0.0, 0.0);
    let hub = g.nodes[0].position().expect("finite hub").distance(&origin);
    for leaf in &g.nodes[1..] {
        let p = leaf.position().expect("finite leaf");
        assert!(hub < p.distance(&origin), "hub {hub} vs {} at {p:?}", leaf.id);
    }
}

#[test]
fn gforce_path_keeps_inner_nodes_nearer_the_center() {
    let mut g = Graph::new(
        ["a", "b", "c", "d"].into_iter().map(Node::new).collect(),
        vec![Edge::new("a", "b"), Edge::new("b", "c"), Edge::new("c", "d")],
    );
    let opts = GForceOptions {
        center: Some(Point::new(0.0, 0.0)),
        max_iteration: 500,
        min_movement: 0.0,
        ..Default::default()
    };
    GForce::new(opts).layout(&mut g).unwrap();

    let origin = Point::new(0.0, 0.0);
    let dist: Vec<f64> = g
        .nodes
        .iter()
        .map(|n| n.position().expect("finite position").distance(&origin))
        .collect();
    let inner = dist[1].max(dist[2]);
    let outer = dist[0].min(dist[3]);
    assert!(inner < outer, "distances to center: {dist:?}");
}

#[test]
fn gforce_respects_the_iteration_budget() {
    let opts = GForceOptions {
        max_iteration: 3,
        min_movement: 0.0,
        ..Default::default()
    };
    let mut g = star(4);
    let outcome = GForce::new(opts).layout(&mut g).unwrap();
    assert_eq!(outcome.status, LayoutStatus::IterationLimit);
    assert_eq!(outcome.iterations, 3);
}

#[test]
fn gforce_same_seed_gives_the_same_layout() {
    let mut a = star(5);
    let mut b = star(5);
    let engine = GForce::new(GForceOptions::default());
    assert_eq!(engine.options().seed, 1);
    engine.layout(&mut a).unwrap();
    engine.layout(&mut b).unwrap();
    assert_eq!(a, b);
}

#[test]
fn gforce_barnes_hut_layout_stays_finite() {
    let n = 300;
    let nodes = (0..n).map(|i| Node::new(format!("n{i}"))).collect();
    let edges = (1..n)
        .map(|i| Edge::new(format!("n{}", (i - 1) / 3), format!("n{i}")))
        .collect();
    let mut g = Graph::new(nodes, edges);
    let opts = GForceOptions {
        max_iteration: 20,
        ..Default::default()
    };
    GForce::new(opts).layout(&mut g).unwrap();
    assert!(g.nodes.iter().all(|n| n.position().is_some()));
}

#[test]
fn gforce_options_parse_from_camel_case_json() {
    let opts = GForceOptions::from_json_str(
        r#"{ "maxIteration": 12, "nodeStrength": 50, "preventOverlap": false, "center": { "x": 1, "y": 2 } }"#,
    )
    .unwrap();
    assert_eq!(opts.max_iteration, 12);
    assert!(!opts.prevent_overlap);
    assert_eq!(opts.center, Some(Point::new(1.0, 2.0)));
    assert_eq!(opts.damping, 0.9);
}

#[test]
fn gforce_rejects_invalid_options_before_touching_the_graph() {
    let mut g = star(2);
    let before = g.clone();
    let opts = GForceOptions {
        max_speed: 0.0,
        ..Default::default()
    };
    let err = GForce::new(opts).layout(&mut g).unwrap_err();
    assert!(matches!(err, narwhal::Error::InvalidOption { name: "maxSpeed", .. }));
    assert_eq!(g, before);

    let err = GForceOptions::from_json_str(r#"{ "damping": -1 }"#).unwrap_err();
    assert!(matches!(err, narwhal::Error::InvalidOption { name: "damping", .. }));
}

/// Two isolated nodes and one connected pair, with extra edges appended.
fn pair_and_isolated(extra: Vec<Edge>) -> Graph {
    let mut edges = vec![Edge::new("a", "b")];
    edges.extend(extra);
    Graph::new(
        vec![
            Node::at("a", -30.0, 0.0),
            Node::at("b", 30.0, 10.0),
            Node::at("c", 0.0, 60.0),
        ],
        edges,
    )
}

#[test]
fn gforce_self_loops_exert_no_pull() {
    let opts = || GForceOptions {
        max_iteration: 40,
        ..Default::default()
    };
    let mut plain = pair_and_isolated(Vec::new());
    let mut looped = pair_and_isolated(vec![Edge::new("c", "c")]);
    GForce::new(opts()).layout(&mut plain).unwrap();
    GForce::new(opts()).layout(&mut looped).unwrap();
    assert_eq!(plain.nodes, looped.nodes);
}

#[test]
fn gforce_skips_edges_to_unknown_nodes() {
    let opts = || GForceOptions {
        max_iteration: 40,
        ..Default::default()
    };
    let mut plain = pair_and_isolated(Vec::new());
    let mut dangling = pair_and_isolated(vec![Edge::new("a", "ghost"), Edge::new("nobody", "c")]);
    let outcome = GForce::new(opts()).layout(&mut dangling).unwrap();
    GForce::new(opts()).layout(&mut plain).unwrap();
    assert!(outcome.iterations > 0);
    assert_eq!(plain.nodes, dangling.nodes);
}

#[test]
fn gforce_parallel_edges_each_add_their_pull() {
    let distance_after_one_step = |edges: Vec<Edge>| {
        let mut g = Graph::new(
            vec![Node::at("a", 0.0, 0.0), Node::at("b", 100.0, 0.0)],
            edges,
        );
        let opts = GForceOptions {
            gravity: 0.0,
            prevent_overlap: false,
            max_iteration: 1,
            min_movement: 0.0,
            mass: Some(Selector::Fixed(1.0)),
            ..Default::default()
        };
        GForce::new(opts).layout(&mut g).unwrap();
        let a = g.node("a").and_then(Node::position).unwrap();
        let b = g.node("b").and_then(Node::position).unwrap();
        a.distance(&b)
    };
    let none = distance_after_one_step(Vec::new());
    let single = distance_after_one_step(vec![Edge::new("a", "b")]);
    let double = distance_after_one_step(vec![Edge::new("a", "b"), Edge::new("b", "a")]);

    assert!(double < single && single < none, "{double} {single} {none}");
    let (one, two) = (none - single, none - double);
    assert!((two - 2.0 * one).abs() < 1e-9 * none, "one edge {one}, two edges {two}");
}

#[test]
fn gforce_prune_runs_a_settling_phase_after_the_budget() {
    let opts = GForceOptions {
        prune: true,
        max_iteration: 30,
        min_movement: 0.0,
        ..Default::default()
    };
    let mut g = star(5);
    let outcome = GForce::new(opts).layout(&mut g).unwrap();
    assert_eq!(outcome.status, LayoutStatus::IterationLimit);
    assert_eq!(
        outcome.iterations,
        30 + GForceOptions::PRUNE_SETTLE_ITERATIONS
    );
    let hub = g.node("hub").and_then(Node::position).unwrap();
    for leaf in &g.nodes[1..] {
        let p = leaf.position().expect("finite leaf");
        assert!(p.distance(&hub) > 0.0, "{} sits on the hub", leaf.id);
    }
}
