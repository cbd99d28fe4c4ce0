//! Outputs trending layer implementation
//!
//! This module provides an OutputsTrendingLayer that corrects each output of a network with
//! its own linear trend `y' = slope * y + intercept`. When an auxiliary scalar such as a
//! time index is supplied, the trend is driven by that scalar instead:
//! `y' = slope * x + intercept`.
//!
//! The layer only stores and evaluates already-known regression parameters. Each output keeps
//! the correlation of its fit as descriptive metadata, which never enters the computation.

use crate::document::XmlElement;
use crate::error::{Result, TrendingError};
use crate::layers::Layer;
use crate::utils::{Matrix, SimpleRng};
use quick_xml::Writer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use tracing::{debug, info, warn};

const ROOT_TAG: &str = "OutputsTrendingLayer";
const METHOD_TAG: &str = "OutputsTrendingMethod";
const NEURONS_NUMBER_TAG: &str = "OutputsTrendingNeuronsNumber";
const NEURON_TAG: &str = "OutputTrendingNeuron";
const INDEX_ATTRIBUTE: &str = "Index";
const INTERCEPT_TAG: &str = "Intercept";
const SLOPE_TAG: &str = "Slope";
const CORRELATION_TAG: &str = "Correlation";
const DISPLAY_TAG: &str = "Display";

/// Available methods for trending the output variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputsTrendingMethod {
    /// Outputs pass through unchanged.
    #[default]
    NoTrending,
    /// Each output is replaced by its linear trend.
    Linear,
}

impl OutputsTrendingMethod {
    /// Canonical name used in expressions, configs and documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputsTrendingMethod::NoTrending => "NoTrending",
            OutputsTrendingMethod::Linear => "Linear",
        }
    }
}

impl fmt::Display for OutputsTrendingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputsTrendingMethod {
    type Err = TrendingError;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "NoTrending" => Ok(OutputsTrendingMethod::NoTrending),
            "Linear" => Ok(OutputsTrendingMethod::Linear),
            other => Err(TrendingError::InvalidMethodName(other.to_string())),
        }
    }
}

/// Linear regression parameters of one output neuron.
///
/// # Example
///
/// ```
/// use outputs_trending_layer::layers::TrendParameters;
///
/// let trend = TrendParameters::new(1.0, 2.0, 0.9);
/// assert_eq!(trend.apply(3.0), 7.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrendParameters {
    pub intercept: f64,
    pub slope: f64,
    /// Goodness of fit, conventionally in [-1, 1]. Not used in computation.
    pub correlation: f64,
}

impl TrendParameters {
    pub fn new(intercept: f64, slope: f64, correlation: f64) -> Self {
        Self {
            intercept,
            slope,
            correlation,
        }
    }

    /// Evaluate `slope * x + intercept`.
    pub fn apply(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Layer of outputs trending neurons.
///
/// Holds one `TrendParameters` per output and a global trending method. The number of
/// trending neurons is the length of the parameter sequence.
///
/// # Fields
///
/// * `method` - Global switch; `NoTrending` makes the layer an identity
/// * `trends` - One parameter triple per output neuron, in output order
/// * `display` - Whether informational messages are logged
///
/// # Example
///
/// ```
/// use outputs_trending_layer::layers::{OutputsTrendingLayer, OutputsTrendingMethod, TrendParameters};
///
/// let mut layer = OutputsTrendingLayer::new();
/// layer.set_outputs_trends(vec![
///     TrendParameters::new(1.0, 2.0, 0.9),
///     TrendParameters::new(-0.5, 0.5, 0.7),
/// ]);
/// layer.set_outputs_trending_method(OutputsTrendingMethod::Linear);
///
/// let outputs = layer.calculate_outputs(&[3.0, 4.0], None).unwrap();
/// assert_eq!(outputs, vec![7.0, 1.5]);
/// ```
#[derive(Debug, Clone)]
pub struct OutputsTrendingLayer {
    method: OutputsTrendingMethod,
    trends: Vec<TrendParameters>,
    display: bool,
}

impl Default for OutputsTrendingLayer {
    fn default() -> Self {
        Self::new()
    }
}

/// Equality covers the method and the parameters; `display` is a logging switch only.
impl PartialEq for OutputsTrendingLayer {
    fn eq(&self, other: &Self) -> bool {
        self.method == other.method && self.trends == other.trends
    }
}

impl OutputsTrendingLayer {
    /// Creates an empty layer with no trending neurons and the `NoTrending` method.
    pub fn new() -> Self {
        Self {
            method: OutputsTrendingMethod::NoTrending,
            trends: Vec::new(),
            display: true,
        }
    }

    /// Creates a layer with `neurons_number` zeroed trends.
    pub fn with_neurons_number(neurons_number: usize) -> Self {
        let mut layer = Self::new();
        layer.set_neurons_number(neurons_number);
        layer
    }

    /// Reconstructs a layer from a structured document.
    pub fn from_xml_document(document: &XmlElement) -> Result<Self> {
        let mut layer = Self::new();
        layer.from_xml(document)?;
        Ok(layer)
    }

    /// Reconstructs a layer from XML text.
    pub fn from_xml_str(source: &str) -> Result<Self> {
        Self::from_xml_document(&XmlElement::parse(source)?)
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn is_empty(&self) -> bool {
        self.trends.is_empty()
    }

    pub fn get_outputs_trending_neurons_number(&self) -> usize {
        self.trends.len()
    }

    pub fn get_outputs_trending_method(&self) -> OutputsTrendingMethod {
        self.method
    }

    /// Canonical name of the current method.
    pub fn write_outputs_trending_method(&self) -> &'static str {
        self.method.as_str()
    }

    pub fn get_intercepts(&self) -> Vec<f64> {
        self.trends.iter().map(|t| t.intercept).collect()
    }

    pub fn get_slopes(&self) -> Vec<f64> {
        self.trends.iter().map(|t| t.slope).collect()
    }

    pub fn get_correlations(&self) -> Vec<f64> {
        self.trends.iter().map(|t| t.correlation).collect()
    }

    pub fn get_intercept(&self, index: usize) -> Result<f64> {
        Ok(self.trend(index)?.intercept)
    }

    pub fn get_slope(&self, index: usize) -> Result<f64> {
        Ok(self.trend(index)?.slope)
    }

    pub fn get_correlation(&self, index: usize) -> Result<f64> {
        Ok(self.trend(index)?.correlation)
    }

    /// Copy of the full parameter sequence.
    pub fn get_outputs_trends(&self) -> Vec<TrendParameters> {
        self.trends.clone()
    }

    pub fn get_display(&self) -> bool {
        self.display
    }

    // ------------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------------

    /// Resets to an empty layer with the default method and display flag.
    pub fn set(&mut self) {
        *self = Self::new();
    }

    /// Resizes to `neurons_number` zeroed trends. The method is left unchanged.
    pub fn set_neurons_number(&mut self, neurons_number: usize) {
        self.trends = vec![TrendParameters::default(); neurons_number];
    }

    /// Copies the full state of `other`, including its display flag.
    pub fn set_from(&mut self, other: &OutputsTrendingLayer) {
        self.clone_from(other);
    }

    /// Loads the state from a structured document. See [`from_xml`](Self::from_xml).
    pub fn set_from_xml(&mut self, document: &XmlElement) -> Result<()> {
        self.from_xml(document)
    }

    pub fn set_outputs_trending_method(&mut self, method: OutputsTrendingMethod) {
        self.method = method;
        if self.display {
            debug!(method = %method, "outputs trending method set");
        }
    }

    /// Sets the method from its canonical name.
    ///
    /// # Errors
    ///
    /// `InvalidMethodName` when `name` is neither `"NoTrending"` nor `"Linear"`.
    pub fn set_outputs_trending_method_str(&mut self, name: &str) -> Result<()> {
        let method = name.parse::<OutputsTrendingMethod>()?;
        self.set_outputs_trending_method(method);
        Ok(())
    }

    pub fn set_intercepts(&mut self, intercepts: &[f64]) -> Result<()> {
        self.check_length("set_intercepts", intercepts.len())?;
        for (trend, &intercept) in self.trends.iter_mut().zip(intercepts) {
            trend.intercept = intercept;
        }
        Ok(())
    }

    pub fn set_intercept(&mut self, index: usize, intercept: f64) -> Result<()> {
        self.trend_mut(index)?.intercept = intercept;
        Ok(())
    }

    pub fn set_slopes(&mut self, slopes: &[f64]) -> Result<()> {
        self.check_length("set_slopes", slopes.len())?;
        for (trend, &slope) in self.trends.iter_mut().zip(slopes) {
            trend.slope = slope;
        }
        Ok(())
    }

    pub fn set_slope(&mut self, index: usize, slope: f64) -> Result<()> {
        self.trend_mut(index)?.slope = slope;
        Ok(())
    }

    pub fn set_correlations(&mut self, correlations: &[f64]) -> Result<()> {
        self.check_length("set_correlations", correlations.len())?;
        for &correlation in correlations {
            self.warn_unusual_correlation(correlation);
        }
        for (trend, &correlation) in self.trends.iter_mut().zip(correlations) {
            trend.correlation = correlation;
        }
        Ok(())
    }

    /// Sets one correlation. Values outside [-1, 1] are accepted.
    pub fn set_correlation(&mut self, index: usize, correlation: f64) -> Result<()> {
        self.check_index(index)?;
        self.warn_unusual_correlation(correlation);
        self.trends[index].correlation = correlation;
        Ok(())
    }

    /// Replaces the whole parameter sequence; the neurons number follows its length.
    pub fn set_outputs_trends(&mut self, trends: Vec<TrendParameters>) {
        self.trends = trends;
    }

    pub fn set_display(&mut self, display: bool) {
        self.display = display;
    }

    /// Resets the method to `NoTrending` and the display flag to true.
    /// Trend parameters are kept as they are.
    pub fn set_default(&mut self) {
        self.method = OutputsTrendingMethod::NoTrending;
        self.display = true;
    }

    /// Removes the trending neuron at `index`; later neurons shift down by one.
    pub fn prune_output_trending_neuron(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        self.trends.remove(index);
        if self.display {
            info!(
                index,
                remaining = self.trends.len(),
                "pruned output trending neuron"
            );
        }
        Ok(())
    }

    /// Sets every intercept, slope and correlation to a uniform value in [-1, 1).
    pub fn initialize_random(&mut self, rng: &mut SimpleRng) {
        for trend in &mut self.trends {
            trend.intercept = rng.gen_range_f64(-1.0, 1.0);
            trend.slope = rng.gen_range_f64(-1.0, 1.0);
            trend.correlation = rng.gen_range_f64(-1.0, 1.0);
        }
        if self.display {
            debug!(
                neurons = self.trends.len(),
                "initialized trend parameters at random"
            );
        }
    }

    // ------------------------------------------------------------------------
    // Outputs and derivatives
    // ------------------------------------------------------------------------

    /// Applies the trend correction to `outputs`.
    ///
    /// With `Linear` and no auxiliary scalar each output is mapped to
    /// `slope * output + intercept`. With `Some(x)` the trend is evaluated at `x`
    /// (typically a time index) for every output: `slope * x + intercept`.
    /// `NoTrending` returns the outputs unchanged in both cases.
    ///
    /// # Errors
    ///
    /// `LengthMismatch` when `outputs.len()` differs from the neurons number.
    pub fn calculate_outputs(&self, outputs: &[f64], auxiliary: Option<f64>) -> Result<Vec<f64>> {
        self.check_length("calculate_outputs", outputs.len())?;

        let corrected = match self.method {
            OutputsTrendingMethod::NoTrending => outputs.to_vec(),
            OutputsTrendingMethod::Linear => match auxiliary {
                None => self
                    .trends
                    .iter()
                    .zip(outputs)
                    .map(|(trend, &y)| trend.apply(y))
                    .collect(),
                Some(x) => self.trends.iter().map(|trend| trend.apply(x)).collect(),
            },
        };
        Ok(corrected)
    }

    /// Derivative of each corrected output with respect to its output: the slopes for
    /// `Linear`, ones for `NoTrending`.
    pub fn calculate_derivatives(&self) -> Vec<f64> {
        match self.method {
            OutputsTrendingMethod::NoTrending => vec![1.0; self.trends.len()],
            OutputsTrendingMethod::Linear => self.get_slopes(),
        }
    }

    /// Linear trends have no curvature, so every second derivative is zero.
    pub fn calculate_second_derivatives(&self) -> Vec<f64> {
        vec![0.0; self.trends.len()]
    }

    /// Diagonal Jacobian with the first derivatives on the diagonal.
    ///
    /// Each corrected output depends only on its own output, so every off-diagonal
    /// entry is zero.
    pub fn arrange_jacobian(&self, outputs: &[f64]) -> Result<Matrix> {
        self.check_length("arrange_jacobian", outputs.len())?;
        Ok(Matrix::from_diagonal(&self.calculate_derivatives()))
    }

    /// One zero N×N matrix per output.
    pub fn arrange_hessian_form(&self, outputs: &[f64]) -> Result<Vec<Matrix>> {
        self.check_length("arrange_hessian_form", outputs.len())?;
        let n = self.trends.len();
        Ok(vec![Matrix::zeros(n, n); n])
    }

    // ------------------------------------------------------------------------
    // Expression
    // ------------------------------------------------------------------------

    /// Renders one assignment per output, e.g. `y = 2*x+1;` or `y = 0.5*x-0.5;`.
    /// The intercept always carries its sign.
    pub fn write_expression<S: AsRef<str>>(
        &self,
        inputs_names: &[S],
        outputs_names: &[S],
    ) -> Result<String> {
        self.check_length("write_expression inputs names", inputs_names.len())?;
        self.check_length("write_expression outputs names", outputs_names.len())?;

        let mut expression = String::new();
        for ((trend, input), output) in self.trends.iter().zip(inputs_names).zip(outputs_names) {
            let (input, output) = (input.as_ref(), output.as_ref());
            match self.method {
                OutputsTrendingMethod::NoTrending => {
                    expression.push_str(&format!("{} = {};\n", output, input));
                }
                OutputsTrendingMethod::Linear => {
                    expression.push_str(&format!(
                        "{} = {}*{}{:+};\n",
                        output, trend.slope, input, trend.intercept
                    ));
                }
            }
        }
        Ok(expression)
    }

    // ------------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------------

    /// Diagnostic dump of the method and parameters.
    pub fn object_to_string(&self) -> String {
        self.to_string()
    }

    /// Builds the structured document for this layer.
    pub fn to_xml(&self) -> XmlElement {
        let mut root = XmlElement::new(ROOT_TAG);
        root.push_child(XmlElement::with_text(METHOD_TAG, self.method.as_str()));
        root.push_child(XmlElement::with_text(
            NEURONS_NUMBER_TAG,
            self.trends.len().to_string(),
        ));

        for (i, trend) in self.trends.iter().enumerate() {
            let mut neuron =
                XmlElement::new(NEURON_TAG).with_attribute(INDEX_ATTRIBUTE, (i + 1).to_string());
            neuron.push_child(XmlElement::with_text(INTERCEPT_TAG, trend.intercept.to_string()));
            neuron.push_child(XmlElement::with_text(SLOPE_TAG, trend.slope.to_string()));
            neuron.push_child(XmlElement::with_text(
                CORRELATION_TAG,
                trend.correlation.to_string(),
            ));
            root.push_child(neuron);
        }

        root.push_child(XmlElement::with_text(
            DISPLAY_TAG,
            if self.display { "1" } else { "0" },
        ));
        root
    }

    /// Streams the layer document into an XML writer.
    pub fn write_xml<W: Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        self.to_xml().write(writer)
    }

    /// Renders the layer document as XML text.
    pub fn to_xml_string(&self) -> Result<String> {
        self.to_xml().to_xml_string()
    }

    /// Loads method, trends and (when present) the display flag from `document`.
    ///
    /// The document is decoded completely before anything is assigned, so on error the
    /// layer keeps its previous state.
    ///
    /// # Errors
    ///
    /// `MalformedDocument` for a wrong root, missing elements, bad indices or non-numeric
    /// values; `InvalidMethodName` for an unknown method token.
    pub fn from_xml(&mut self, document: &XmlElement) -> Result<()> {
        let decoded = decode_document(document)?;

        self.method = decoded.method;
        self.trends = decoded.trends;
        if let Some(display) = decoded.display {
            self.display = display;
        }

        if self.display {
            debug!(
                method = %self.method,
                neurons = self.trends.len(),
                "loaded outputs trending layer from document"
            );
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Checks
    // ------------------------------------------------------------------------

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.trends.len() {
            return Err(TrendingError::IndexOutOfRange {
                index,
                len: self.trends.len(),
            });
        }
        Ok(())
    }

    fn check_length(&self, context: &'static str, got: usize) -> Result<()> {
        if got != self.trends.len() {
            return Err(TrendingError::length_mismatch(context, self.trends.len(), got));
        }
        Ok(())
    }

    fn trend(&self, index: usize) -> Result<&TrendParameters> {
        self.check_index(index)?;
        Ok(&self.trends[index])
    }

    fn trend_mut(&mut self, index: usize) -> Result<&mut TrendParameters> {
        self.check_index(index)?;
        Ok(&mut self.trends[index])
    }

    fn warn_unusual_correlation(&self, correlation: f64) {
        if self.display && !(-1.0..=1.0).contains(&correlation) {
            warn!(correlation, "correlation outside [-1, 1]");
        }
    }
}

impl Layer for OutputsTrendingLayer {
    fn forward(&self, inputs: &[f64]) -> Result<Vec<f64>> {
        self.calculate_outputs(inputs, None)
    }

    fn jacobian(&self, inputs: &[f64]) -> Result<Matrix> {
        self.arrange_jacobian(inputs)
    }

    fn input_size(&self) -> usize {
        self.trends.len()
    }

    fn output_size(&self) -> usize {
        self.trends.len()
    }

    /// Intercept and slope per neuron; correlations do not affect outputs.
    fn parameter_count(&self) -> usize {
        2 * self.trends.len()
    }
}

impl fmt::Display for OutputsTrendingLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |values: Vec<f64>| {
            values
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        };

        writeln!(f, "Outputs trending layer")?;
        writeln!(f, "Outputs trending method: {}", self.method)?;
        writeln!(f, "Outputs trending neurons number: {}", self.trends.len())?;
        writeln!(f, "Intercepts: {}", join(self.get_intercepts()))?;
        writeln!(f, "Slopes: {}", join(self.get_slopes()))?;
        writeln!(f, "Correlations: {}", join(self.get_correlations()))?;
        writeln!(f, "Display: {}", self.display)
    }
}

struct DecodedLayer {
    method: OutputsTrendingMethod,
    trends: Vec<TrendParameters>,
    display: Option<bool>,
}

fn decode_document(document: &XmlElement) -> Result<DecodedLayer> {
    if document.name() != ROOT_TAG {
        return Err(malformed(format!(
            "expected root element <{}>, found <{}>",
            ROOT_TAG,
            document.name()
        )));
    }

    check_children(
        document,
        &[METHOD_TAG, NEURONS_NUMBER_TAG, NEURON_TAG, DISPLAY_TAG],
        &[METHOD_TAG, NEURONS_NUMBER_TAG, DISPLAY_TAG],
    )?;

    let method = required_child(document, METHOD_TAG)?
        .text()
        .trim()
        .parse::<OutputsTrendingMethod>()?;

    let neurons: Vec<&XmlElement> = document.children_named(NEURON_TAG).collect();

    if let Some(number) = document.child(NEURONS_NUMBER_TAG) {
        let declared: usize = parse_text(number)?;
        if declared != neurons.len() {
            return Err(malformed(format!(
                "{} is {} but {} <{}> elements were found",
                NEURONS_NUMBER_TAG,
                declared,
                neurons.len(),
                NEURON_TAG
            )));
        }
    }

    let mut trends = Vec::with_capacity(neurons.len());
    for (i, neuron) in neurons.into_iter().enumerate() {
        let index = neuron
            .attribute(INDEX_ATTRIBUTE)
            .ok_or_else(|| malformed(format!("<{}> without {} attribute", NEURON_TAG, INDEX_ATTRIBUTE)))?;
        if index.trim().parse::<usize>().ok() != Some(i + 1) {
            return Err(malformed(format!(
                "<{}> has {} '{}', expected {}",
                NEURON_TAG,
                INDEX_ATTRIBUTE,
                index,
                i + 1
            )));
        }

        let fields = [INTERCEPT_TAG, SLOPE_TAG, CORRELATION_TAG];
        check_children(neuron, &fields, &fields)?;

        trends.push(TrendParameters {
            intercept: parse_text(required_child(neuron, INTERCEPT_TAG)?)?,
            slope: parse_text(required_child(neuron, SLOPE_TAG)?)?,
            correlation: parse_text(required_child(neuron, CORRELATION_TAG)?)?,
        });
    }

    let display = match document.child(DISPLAY_TAG) {
        Some(element) => Some(parse_flag(element)?),
        None => None,
    };

    Ok(DecodedLayer {
        method,
        trends,
        display,
    })
}

/// Rejects children outside `allowed` and repeats of any element in `single`.
fn check_children(parent: &XmlElement, allowed: &[&str], single: &[&str]) -> Result<()> {
    if let Some(unknown) = parent
        .children()
        .iter()
        .find(|c| !allowed.contains(&c.name()))
    {
        return Err(malformed(format!(
            "<{}> has unexpected element <{}>",
            parent.name(),
            unknown.name()
        )));
    }

    for &name in single {
        if parent.children_named(name).count() > 1 {
            return Err(malformed(format!(
                "<{}> has more than one <{}> element",
                parent.name(),
                name
            )));
        }
    }
    Ok(())
}

fn required_child<'a>(parent: &'a XmlElement, name: &str) -> Result<&'a XmlElement> {
    parent
        .child(name)
        .ok_or_else(|| malformed(format!("<{}> has no <{}> element", parent.name(), name)))
}

fn parse_text<T: FromStr>(element: &XmlElement) -> Result<T> {
    element.text().trim().parse::<T>().map_err(|_| {
        malformed(format!(
            "<{}> has unparsable value '{}'",
            element.name(),
            element.text()
        ))
    })
}

fn parse_flag(element: &XmlElement) -> Result<bool> {
    match element.text().trim() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        other => Err(malformed(format!(
            "<{}> has unparsable flag '{}'",
            element.name(),
            other
        ))),
    }
}

fn malformed(message: String) -> TrendingError {
    TrendingError::MalformedDocument(message)
}
