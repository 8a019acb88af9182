use approx::assert_relative_eq;
use fea_engine::prelude::*;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

const SPRING: f64 = 50.0;
const HEIGHT: f64 = 2.0;

/// Pinned column braced at the top by a lateral spring
///
/// The column uses Green-Lagrange strain so its axial force softens the
/// lateral stiffness: k_t = k - P/l, critical at P = k·l ≈ k·L.
fn braced_column() -> (System, NodeId) {
    let mut system = System::new();
    let base = system.add_node(Node::new(0.0, 0.0));
    let top = system.add_node(Node::new(0.0, HEIGHT));
    let anchor = system.add_node(Node::new(1.0, HEIGHT));

    let stiff = Box::new(Elastic::with_modulus(1e6));
    let column = Truss::new(base, top, stiff, TrussConfig::default().finite()).unwrap();
    let soft = Box::new(Elastic::with_modulus(SPRING));
    let spring = Truss::new(top, anchor, soft, TrussConfig::default()).unwrap();
    system.add_element(column).unwrap();
    system.add_element(spring).unwrap();

    for &support in &[base, anchor] {
        system.node_mut(support).unwrap().fix_dof(&[DofKind::Ux, DofKind::Uy]).unwrap();
    }
    system.node_mut(top).unwrap().set_load(&[-1.0], &[DofKind::Uy]).unwrap();
    (system, top)
}

#[test]
fn stable_below_critical_load() {
    init_logging();
    let critical = SPRING * HEIGHT;
    let (mut system, _) = braced_column();
    NewtonRaphsonSolver::default()
        .solve_to(&mut system, 0.95 * critical, 5)
        .unwrap();

    let report = check_stability(&mut system).unwrap();
    assert!(report.stable);
    assert_eq!(report.negative_count, 0);
    assert!(report.determinant > 0.0);
    // lateral stiffness k - P/l with l just below L
    assert_relative_eq!(report.min_eigenvalue, 0.05 * SPRING, max_relative = 1e-2);
}

#[test]
fn unstable_above_critical_load() {
    init_logging();
    let critical = SPRING * HEIGHT;
    let (mut system, top) = braced_column();
    let solver = NewtonRaphsonSolver::default();
    solver.solve_to(&mut system, 0.95 * critical, 5).unwrap();
    solver.step(&mut system, 1.05 * critical).unwrap();

    let report = check_stability(&mut system).unwrap();
    assert!(!report.stable);
    assert_eq!(report.negative_count, 1);
    assert!(report.determinant < 0.0);
    assert!(report.min_eigenvalue < 0.0);

    let mode = buckling_mode(&mut system).unwrap();
    let sway = mode
        .iter()
        .find(|(h, _)| h.node == top && h.kind == DofKind::Ux)
        .unwrap()
        .1;
    let axial = mode
        .iter()
        .find(|(h, _)| h.node == top && h.kind == DofKind::Uy)
        .unwrap()
        .1;
    assert_relative_eq!(sway.abs(), 1.0, epsilon = 1e-12);
    assert_relative_eq!(axial, 0.0, epsilon = 1e-9);
}
