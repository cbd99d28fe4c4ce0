//! Tests for outputs trending layer serialization
//!
//! This file tests:
//! - Document round trips through the element tree and through XML text
//! - Streaming the layer into an XML writer
//! - Rejection of malformed documents and unknown methods
//! - Atomic loading: a failed load leaves the layer unchanged
//! - The diagnostic string dump

use outputs_trending_layer::document::XmlElement;
use outputs_trending_layer::layers::{OutputsTrendingLayer, OutputsTrendingMethod, TrendParameters};
use outputs_trending_layer::utils::SimpleRng;
use outputs_trending_layer::TrendingError;
use quick_xml::Writer;

fn linear_layer() -> OutputsTrendingLayer {
    let mut layer = OutputsTrendingLayer::new();
    layer.set_outputs_trends(vec![
        TrendParameters::new(1.0, 2.0, 0.9),
        TrendParameters::new(-0.5, 0.5, 0.7),
    ]);
    layer.set_outputs_trending_method(OutputsTrendingMethod::Linear);
    layer
}

const LINEAR_DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<OutputsTrendingLayer>
  <OutputsTrendingMethod>Linear</OutputsTrendingMethod>
  <OutputsTrendingNeuronsNumber>2</OutputsTrendingNeuronsNumber>
  <OutputTrendingNeuron Index="1">
    <Intercept>1</Intercept>
    <Slope>2</Slope>
    <Correlation>0.9</Correlation>
  </OutputTrendingNeuron>
  <OutputTrendingNeuron Index="2">
    <Intercept>-0.5</Intercept>
    <Slope>0.5</Slope>
    <Correlation>0.7</Correlation>
  </OutputTrendingNeuron>
</OutputsTrendingLayer>"#;

// ============================================================================
// Round Trip Tests
// ============================================================================

mod round_trip_tests {
    use super::*;

    #[test]
    fn test_element_round_trip() {
        let layer = linear_layer();
        let restored = OutputsTrendingLayer::from_xml_document(&layer.to_xml()).unwrap();
        assert_eq!(restored, layer);
    }

    #[test]
    fn test_text_round_trip() {
        let layer = linear_layer();
        let text = layer.to_xml_string().unwrap();
        let restored = OutputsTrendingLayer::from_xml_str(&text).unwrap();
        assert_eq!(restored, layer);
    }

    #[test]
    fn test_empty_layer_round_trip() {
        let layer = OutputsTrendingLayer::new();
        let text = layer.to_xml_string().unwrap();
        let restored = OutputsTrendingLayer::from_xml_str(&text).unwrap();
        assert_eq!(restored, layer);
        assert!(restored.is_empty());
    }

    #[test]
    fn test_random_layers_round_trip_exactly() {
        let mut rng = SimpleRng::new(1234);
        for n in 0..10 {
            let mut layer = OutputsTrendingLayer::with_neurons_number(n);
            layer.set_display(false);
            layer.initialize_random(&mut rng);
            if n % 2 == 0 {
                layer.set_outputs_trending_method(OutputsTrendingMethod::Linear);
            }

            let text = layer.to_xml_string().unwrap();
            let restored = OutputsTrendingLayer::from_xml_str(&text).unwrap();

            // Exact floating-point equality, not approximate.
            assert_eq!(restored.get_intercepts(), layer.get_intercepts());
            assert_eq!(restored.get_slopes(), layer.get_slopes());
            assert_eq!(restored.get_correlations(), layer.get_correlations());
            assert_eq!(restored, layer);
        }
    }

    #[test]
    fn test_extreme_values_round_trip() {
        let mut layer = OutputsTrendingLayer::new();
        layer.set_outputs_trends(vec![
            TrendParameters::new(1e-300, -1.7976931348623157e308, 0.1 + 0.2),
            TrendParameters::new(std::f64::consts::PI, 5e-324, -1.0),
        ]);
        let restored = OutputsTrendingLayer::from_xml_str(&layer.to_xml_string().unwrap()).unwrap();
        assert_eq!(restored, layer);
    }

    #[test]
    fn test_display_flag_round_trip() {
        let mut layer = linear_layer();
        layer.set_display(false);
        let restored = OutputsTrendingLayer::from_xml_document(&layer.to_xml()).unwrap();
        assert!(!restored.get_display());
    }

    #[test]
    fn test_parse_reference_document() {
        let layer = OutputsTrendingLayer::from_xml_str(LINEAR_DOCUMENT).unwrap();
        assert_eq!(layer, linear_layer());
        assert!(layer.get_display());
    }

    #[test]
    fn test_set_from_xml_replaces_state() {
        let mut layer = OutputsTrendingLayer::with_neurons_number(5);
        layer.set_from_xml(&linear_layer().to_xml()).unwrap();
        assert_eq!(layer, linear_layer());
    }
}

// ============================================================================
// Document Structure Tests
// ============================================================================

mod structure_tests {
    use super::*;

    #[test]
    fn test_document_schema() {
        let document = linear_layer().to_xml();
        assert_eq!(document.name(), "OutputsTrendingLayer");
        assert_eq!(document.child("OutputsTrendingMethod").unwrap().text(), "Linear");
        assert_eq!(
            document.child("OutputsTrendingNeuronsNumber").unwrap().text(),
            "2"
        );

        let neurons: Vec<&XmlElement> = document.children_named("OutputTrendingNeuron").collect();
        assert_eq!(neurons.len(), 2);
        assert_eq!(neurons[0].attribute("Index"), Some("1"));
        assert_eq!(neurons[1].attribute("Index"), Some("2"));
        assert_eq!(neurons[1].child("Intercept").unwrap().text(), "-0.5");
        assert_eq!(neurons[1].child("Slope").unwrap().text(), "0.5");
        assert_eq!(neurons[1].child("Correlation").unwrap().text(), "0.7");
    }

    #[test]
    fn test_write_xml_into_writer() {
        let layer = linear_layer();
        let mut writer = Writer::new(Vec::new());
        layer.write_xml(&mut writer).unwrap();
        let text = String::from_utf8(writer.into_inner()).unwrap();

        assert!(text.starts_with("<OutputsTrendingLayer>"));
        assert!(text.contains("<OutputsTrendingMethod>Linear</OutputsTrendingMethod>"));
        assert!(text.contains("<OutputTrendingNeuron Index=\"2\">"));
        assert_eq!(OutputsTrendingLayer::from_xml_str(&text).unwrap(), layer);
    }
}

// ============================================================================
// Malformed Document Tests
// ============================================================================

mod malformed_document_tests {
    use super::*;

    fn assert_malformed(source: &str) {
        let result = OutputsTrendingLayer::from_xml_str(source);
        assert!(
            matches!(result, Err(TrendingError::MalformedDocument(_))),
            "expected MalformedDocument for {:?}, got {:?}",
            source,
            result
        );
    }

    #[test]
    fn test_wrong_root() {
        assert_malformed("<ScalingLayer><OutputsTrendingMethod>Linear</OutputsTrendingMethod></ScalingLayer>");
    }

    #[test]
    fn test_missing_method() {
        assert_malformed("<OutputsTrendingLayer></OutputsTrendingLayer>");
    }

    #[test]
    fn test_unknown_method() {
        let source = LINEAR_DOCUMENT.replace(">Linear<", ">Quadratic<");
        assert!(matches!(
            OutputsTrendingLayer::from_xml_str(&source),
            Err(TrendingError::InvalidMethodName(_))
        ));
    }

    #[test]
    fn test_non_numeric_slope() {
        assert_malformed(&LINEAR_DOCUMENT.replace("<Slope>2</Slope>", "<Slope>two</Slope>"));
    }

    #[test]
    fn test_missing_correlation() {
        assert_malformed(&LINEAR_DOCUMENT.replace("<Correlation>0.7</Correlation>", ""));
    }

    #[test]
    fn test_neurons_number_mismatch() {
        assert_malformed(&LINEAR_DOCUMENT.replace(
            "<OutputsTrendingNeuronsNumber>2<",
            "<OutputsTrendingNeuronsNumber>3<",
        ));
    }

    #[test]
    fn test_out_of_order_index() {
        assert_malformed(&LINEAR_DOCUMENT.replace("Index=\"2\"", "Index=\"5\""));
    }

    #[test]
    fn test_missing_index() {
        assert_malformed(&LINEAR_DOCUMENT.replace(" Index=\"1\"", ""));
    }

    #[test]
    fn test_bad_display_flag() {
        let source = LINEAR_DOCUMENT.replace(
            "</OutputsTrendingLayer>",
            "<Display>maybe</Display></OutputsTrendingLayer>",
        );
        assert_malformed(&source);
    }

    #[test]
    fn test_misspelled_neuron_tag() {
        // Without the neurons number the misspelled neurons would otherwise vanish.
        let source = "<OutputsTrendingLayer>\
            <OutputsTrendingMethod>Linear</OutputsTrendingMethod>\
            <OutputTrendNeuron Index=\"1\">\
            <Intercept>1</Intercept><Slope>2</Slope><Correlation>0.9</Correlation>\
            </OutputTrendNeuron>\
            </OutputsTrendingLayer>";
        assert_malformed(source);
    }

    #[test]
    fn test_unknown_root_child() {
        assert_malformed(&LINEAR_DOCUMENT.replace(
            "</OutputsTrendingLayer>",
            "<Bogus/></OutputsTrendingLayer>",
        ));
    }

    #[test]
    fn test_unknown_neuron_child() {
        assert_malformed(&LINEAR_DOCUMENT.replace(
            "<Slope>2</Slope>",
            "<Slope>2</Slope><Curvature>0</Curvature>",
        ));
    }

    #[test]
    fn test_duplicate_method() {
        assert_malformed(&LINEAR_DOCUMENT.replace(
            "<OutputsTrendingMethod>Linear</OutputsTrendingMethod>",
            "<OutputsTrendingMethod>Linear</OutputsTrendingMethod>\
             <OutputsTrendingMethod>Quadratic</OutputsTrendingMethod>",
        ));
    }

    #[test]
    fn test_duplicate_neuron_field() {
        assert_malformed(&LINEAR_DOCUMENT.replace(
            "<Intercept>-0.5</Intercept>",
            "<Intercept>-0.5</Intercept><Intercept>3</Intercept>",
        ));
        assert_malformed(&LINEAR_DOCUMENT.replace(
            "<Correlation>0.9</Correlation>",
            "<Correlation>0.9</Correlation><Correlation>0.1</Correlation>",
        ));
    }

    #[test]
    fn test_duplicate_neurons_number_and_display() {
        assert_malformed(&LINEAR_DOCUMENT.replace(
            "</OutputsTrendingLayer>",
            "<OutputsTrendingNeuronsNumber>2</OutputsTrendingNeuronsNumber></OutputsTrendingLayer>",
        ));
        assert_malformed(&LINEAR_DOCUMENT.replace(
            "</OutputsTrendingLayer>",
            "<Display>1</Display><Display>0</Display></OutputsTrendingLayer>",
        ));
    }

    #[test]
    fn test_invalid_xml_text_is_an_error() {
        assert!(OutputsTrendingLayer::from_xml_str("<OutputsTrendingLayer>").is_err());
        assert!(OutputsTrendingLayer::from_xml_str("").is_err());
    }
}

// ============================================================================
// Atomic Loading Tests
// ============================================================================

mod atomic_loading_tests {
    use super::*;

    #[test]
    fn test_failed_load_keeps_previous_state() {
        let mut layer = linear_layer();
        layer.set_display(false);
        let before = layer.clone();

        let bad = XmlElement::parse(&LINEAR_DOCUMENT.replace("<Slope>0.5</Slope>", "<Slope>x</Slope>"))
            .unwrap();
        assert!(layer.from_xml(&bad).is_err());

        assert_eq!(layer, before);
        assert!(!layer.get_display());
        assert_eq!(layer.get_outputs_trending_method(), OutputsTrendingMethod::Linear);
    }

    #[test]
    fn test_failed_method_keeps_previous_state() {
        let mut layer = OutputsTrendingLayer::with_neurons_number(3);
        let bad = XmlElement::parse(&LINEAR_DOCUMENT.replace(">Linear<", ">Cubic<")).unwrap();
        assert!(layer.from_xml(&bad).is_err());
        assert_eq!(layer.get_outputs_trending_neurons_number(), 3);
        assert_eq!(layer.get_outputs_trending_method(), OutputsTrendingMethod::NoTrending);
    }
}

// ============================================================================
// Diagnostic Dump Tests
// ============================================================================

mod object_to_string_tests {
    use super::*;

    #[test]
    fn test_object_to_string_lists_parameters() {
        let text = linear_layer().object_to_string();
        assert!(text.contains("Outputs trending method: Linear"));
        assert!(text.contains("Intercepts: 1 -0.5"));
        assert!(text.contains("Slopes: 2 0.5"));
        assert!(text.contains("Correlations: 0.9 0.7"));
    }

    #[test]
    fn test_display_matches_object_to_string() {
        let layer = linear_layer();
        assert_eq!(layer.to_string(), layer.object_to_string());
    }
}
