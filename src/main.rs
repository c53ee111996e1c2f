use std::{env, io};

use log::info;
use rand::{SeedableRng, rngs::StdRng};

use convnet::{
    arch::ConvNet,
    config::TrainingConfig,
    data::mnist,
    training::{Trainer, evaluate},
};

fn main() -> io::Result<()> {
    env_logger::init();

    let config = match env::args().nth(1) {
        Some(path) => TrainingConfig::from_file(path)?,
        None => TrainingConfig::default(),
    };

    info!("loading dataset from {}", config.data_dir.display());
    let mut data = mnist::load_data(&config.data_dir)?;
    info!(
        "{} training samples, {} test samples",
        data.train.len(),
        data.test.len()
    );

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut model = ConvNet::new(&config, &mut rng)?;
    info!("model has {} parameters", model.size());

    {
        let mut trainer = Trainer::new(&mut model, config.clone());
        let history = trainer.fit(&mut data.train);

        if let Some(best) = history.best() {
            info!("best epoch loss {best:.6}");
        }
    }

    model.save(&config.checkpoint_dir)?;
    info!("saved parameters to {}", config.checkpoint_dir.display());

    info!("testing...");
    let accuracy = evaluate(&mut model, &data.test, config.batch_size);
    println!("rate = {accuracy}");

    Ok(())
}
