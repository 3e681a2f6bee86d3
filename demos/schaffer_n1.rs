//! Schaffer's Problem No.1 solved with the multi-objective fireworks
//! optimizer.

use std::{fs::File, io::Write, path::Path};

use mofw::{
  problem::FnMultiProblem,
  FireworksHeuristic,
  FwParams,
  MofwOptimizer,
};

fn main() {
  // objective functions `f1(x) = x^2` and `f2(x) = (x - 2)^2`
  let problem = FnMultiProblem::new(
    vec![-10.0],
    vec![10.0],
    2,
    |x: &[f64], objs: &mut [f64]| {
      objs[0] = x[0].powi(2);
      objs[1] = (x[0] - 2.0).powi(2);
    },
  );

  // 40 charges, each scattering 2 to 20 debris from a total budget of 20,
  // for 200 iterations
  let params = FwParams::builder()
    .np(40)
    .m(20)
    .imax(200)
    .smin(2)
    .smax(20)
    .amax(5.0)
    .build();

  let mut optimizer = MofwOptimizer::new();
  // report every 50th iteration
  let mut reporter = |p: mofw::Progress| {
    if p.current % 50 == 0 {
      println!("iteration {} of {}", p.current, p.end);
    }
  };
  optimizer
    .minimize_reporting(&params, &problem, &mut reporter)
    .unwrap();

  let front = optimizer.pareto_front();

  // write front objective values to file in demos/schaffer_n1.csv
  let _ = File::create(Path::new(file!()).with_file_name("schaffer_n1.csv"))
    .unwrap()
    .write_all(
      front
        .iter()
        .map(|agent| format!("{} {}", agent.objs()[0], agent.objs()[1]))
        .collect::<Vec<_>>()
        .join("\n")
        .as_bytes(),
    );

  // print the first 10 solutions
  for agent in front.iter().take(10) {
    println!("{:.4}", agent.point()[0]);
  }
  println!("  ...  ");
}
