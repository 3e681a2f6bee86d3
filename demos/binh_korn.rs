//! The Binh and Korn function solved with the multi-objective fireworks
//! optimizer.

use std::{fs::File, io::Write, path::Path};

use mofw::{
  problem::FnMultiProblem,
  FireworksHeuristic,
  FwParams,
  MofwOptimizer,
};

fn main() {
  // objective function f1(x, y) = 4x^2 + 4y^2
  // and another objective function f2(x, y) = (x - 5)^2 + (y - 5)^2
  let problem = FnMultiProblem::new(
    vec![0.0, 0.0],
    vec![5.0, 3.0],
    2,
    |p: &[f64], objs: &mut [f64]| {
      let (x, y) = (p[0], p[1]);
      objs[0] = 4.0 * x.powi(2) + 4.0 * y.powi(2);
      objs[1] = (x - 5.0).powi(2) + (y - 5.0).powi(2);
    },
  );

  let params = FwParams::builder()
    .np(50)
    .m(30)
    .imax(300)
    .smin(2)
    .smax(15)
    .amax(2.0)
    .build();

  let mut optimizer = MofwOptimizer::new();
  optimizer.minimize(&params, &problem).unwrap();

  let front = optimizer.pareto_front();

  // write front objective values to file in demos/binh_korn.csv
  let _ = File::create(Path::new(file!()).with_file_name("binh_korn.csv"))
    .unwrap()
    .write_all(
      front
        .iter()
        .map(|agent| format!("{} {}", agent.objs()[0], agent.objs()[1]))
        .collect::<Vec<_>>()
        .join("\n")
        .as_bytes(),
    );

  // and print the first 10 solutions
  println!("   x   |   y   ");
  for agent in front.iter().take(10) {
    println!("{:.4} | {:.4}", agent.point()[0], agent.point()[1]);
  }
  println!("  ...  |  ...  ");
}
