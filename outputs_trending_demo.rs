use outputs_trending_layer::config::{build_layer, load_config};
use outputs_trending_layer::layers::OutputsTrendingLayer;
use std::env;
use std::process;

// Applies a configured outputs trending layer to a sample output vector.
// Usage: outputs_trending_demo <config.json> [comma separated outputs] [auxiliary scalar]
const DEFAULT_CONFIG: &str = "config/linear_trends.json";

// Parse "3.0,4.0" into a vector of outputs.
fn parse_outputs(text: &str) -> Result<Vec<f64>, String> {
    text.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|e| format!("invalid output value '{}': {}", part, e))
        })
        .collect()
}

fn run(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = args.get(1).map(String::as_str).unwrap_or(DEFAULT_CONFIG);
    let config = load_config(config_path)?;
    let layer: OutputsTrendingLayer = build_layer(&config)?;
    let n = layer.get_outputs_trending_neurons_number();

    // Default sample: 1, 2, ..., n.
    let outputs = match args.get(2) {
        Some(text) => parse_outputs(text)?,
        None => (1..=n).map(|i| i as f64).collect(),
    };
    let auxiliary = match args.get(3) {
        Some(text) => Some(text.trim().parse::<f64>()?),
        None => None,
    };

    println!("{}", layer.object_to_string());

    let inputs_names: Vec<String> = (1..=n).map(|i| format!("y_{}", i)).collect();
    let outputs_names: Vec<String> = (1..=n).map(|i| format!("trended_y_{}", i)).collect();
    println!("Expression:");
    print!("{}", layer.write_expression(&inputs_names, &outputs_names)?);

    let corrected = layer.calculate_outputs(&outputs, auxiliary)?;
    println!("Outputs:           {:?}", outputs);
    println!("Corrected outputs: {:?}", corrected);
    println!("Derivatives:       {:?}", layer.calculate_derivatives());
    println!("Jacobian:");
    print!("{}", layer.arrange_jacobian(&outputs)?);

    println!();
    println!("{}", layer.to_xml_string()?);
    Ok(())
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
