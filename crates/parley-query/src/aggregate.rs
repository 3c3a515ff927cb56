use bson::{Bson, Document, doc};

/// One aggregation step recognised in a request.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationStage {
    /// Count documents per distinct value of a field, most frequent first.
    GroupBy(String),
    AverageOf(String),
    SumOf(String),
    /// Pipeline stages supplied verbatim.
    RawPipeline(Vec<Document>),
}

impl AggregationStage {
    fn append_to(&self, pipeline: &mut Vec<Document>) {
        match self {
            AggregationStage::GroupBy(field) => {
                pipeline.push(doc! {
                    "$group": { "_id": format!("${field}"), "count": { "$sum": 1_i32 } }
                });
                pipeline.push(doc! { "$sort": { "count": -1_i32 } });
            }
            AggregationStage::AverageOf(field) => {
                let mut group = doc! { "_id": Bson::Null };
                group.insert(format!("avg_{field}"), doc! { "$avg": format!("${field}") });
                group.insert("total_documents", doc! { "$sum": 1_i32 });
                pipeline.push(doc! { "$group": group });
            }
            AggregationStage::SumOf(field) => {
                let mut group = doc! { "_id": Bson::Null };
                group.insert(format!("total_{field}"), doc! { "$sum": format!("${field}") });
                group.insert("document_count", doc! { "$sum": 1_i32 });
                pipeline.push(doc! { "$group": group });
            }
            AggregationStage::RawPipeline(stages) => pipeline.extend(stages.iter().cloned()),
        }
    }
}

/// Ordered aggregation stages, executed in sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationSpec {
    pub stages: Vec<AggregationStage>,
}

impl AggregationSpec {
    pub fn single(stage: AggregationStage) -> Self {
        Self {
            stages: vec![stage],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stages.iter().all(|stage| match stage {
            AggregationStage::RawPipeline(stages) => stages.is_empty(),
            _ => false,
        })
    }

    /// Render the store pipeline.
    pub fn to_pipeline(&self) -> Vec<Document> {
        let mut pipeline = Vec::new();
        for stage in &self.stages {
            stage.append_to(&mut pipeline);
        }
        pipeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_by_counts_and_sorts() {
        let pipeline = AggregationSpec::single(AggregationStage::GroupBy("category".into()))
            .to_pipeline();
        assert_eq!(
            pipeline,
            vec![
                doc! { "$group": { "_id": "$category", "count": { "$sum": 1_i32 } } },
                doc! { "$sort": { "count": -1_i32 } },
            ]
        );
    }

    #[test]
    fn average_names_the_accumulator_after_the_field() {
        let pipeline =
            AggregationSpec::single(AggregationStage::AverageOf("price".into())).to_pipeline();
        let group = pipeline[0].get_document("$group").unwrap();
        assert_eq!(group.get("_id"), Some(&Bson::Null));
        assert_eq!(
            group.get_document("avg_price").unwrap(),
            &doc! { "$avg": "$price" }
        );
        assert!(group.contains_key("total_documents"));
    }

    #[test]
    fn sum_names_the_accumulator_after_the_field() {
        let pipeline = AggregationSpec::single(AggregationStage::SumOf("qty".into())).to_pipeline();
        let group = pipeline[0].get_document("$group").unwrap();
        assert_eq!(group.get_document("total_qty").unwrap(), &doc! { "$sum": "$qty" });
        assert!(group.contains_key("document_count"));
    }

    #[test]
    fn raw_pipeline_passes_through() {
        let stages = vec![doc! { "$match": { "a": 1_i32 } }, doc! { "$limit": 5_i32 }];
        let spec = AggregationSpec::single(AggregationStage::RawPipeline(stages.clone()));
        assert_eq!(spec.to_pipeline(), stages);
        assert!(!spec.is_empty());
        assert!(AggregationSpec::single(AggregationStage::RawPipeline(vec![])).is_empty());
    }
}
