use strata_nn::{Column, ColumnKind, Dataset, Matrix, NetConfig, Network, TargetKind};

fn main() -> strata_nn::Result<()> {
    tracing_subscriber::fmt().compact().init();

    let table = Dataset::from_columns(vec![
        Column::new("x1", ColumnKind::Double, vec![0.0, 0.0, 1.0, 1.0]),
        Column::new("x2", ColumnKind::Double, vec![0.0, 1.0, 0.0, 1.0]),
        Column::new("y", ColumnKind::Integer, vec![0.0, 1.0, 1.0, 0.0]),
    ])?;

    let mut config = NetConfig::new(vec![2, 3, 1], TargetKind::Binary);
    config.seed = Some(7);
    let mut net = Network::new(&config)?;
    net.set_learning(0.9);
    net.set_momentum(0.9);
    net.set_regularizer(0.0);
    net.set_batch_size(4);

    net.bind_data(&table, "y ~ *")?;
    net.pretrain(200)?;
    let loss = net.train(4000, 500)?;
    println!("final loss = {loss:.6}");

    let corners = Matrix::from_data(vec![
        vec![0.0, 0.0],
        vec![0.0, 1.0],
        vec![1.0, 0.0],
        vec![1.0, 1.0],
    ]);
    let out = net.predict(&corners)?;
    for (input, prediction) in corners.data.iter().zip(out.data.iter()) {
        println!("{:?} -> {:.4}", input, prediction[0]);
    }
    Ok(())
}
