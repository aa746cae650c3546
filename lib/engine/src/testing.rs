use crate::context::RecommendationContext;
use nutrirank_core::{
    AnnIndex, EmbeddingStore, FlatIndex, IdentifierMapping, InternalIndex, ItemNormalization,
    QualityScoreTable, Result, Vector,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Products 101..=606 on rows 0..6, six identity-mapped users, dim 3.
/// 606 has no quality score; 505 is stored at the neutral 0.5.
pub(crate) fn sample_context() -> RecommendationContext {
    context_with_index(|store| -> Arc<dyn AnnIndex> { Arc::new(FlatIndex::from_store(store)) })
}

pub(crate) fn context_with_index<F>(make_index: F) -> RecommendationContext
where
    F: FnOnce(&EmbeddingStore) -> Arc<dyn AnnIndex>,
{
    let products = IdentifierMapping::from_pairs([
        (101, 0),
        (202, 1),
        (303, 2),
        (404, 3),
        (505, 4),
        (606, 5),
    ])
    .unwrap();
    let items = vec![
        Vector::new(vec![1.0, 0.0, 0.0]),
        Vector::new(vec![0.0, 1.0, 0.0]),
        Vector::new(vec![0.9, 0.1, 0.0]),
        Vector::new(vec![0.1, 0.9, 0.1]),
        Vector::new(vec![0.0, 0.0, 1.0]),
        Vector::new(vec![0.7, 0.7, 0.1]),
    ];
    let users = vec![
        Vector::new(vec![2.0, 0.0, 0.0]),
        Vector::new(vec![0.0, 2.0, 0.0]),
        Vector::new(vec![0.0, 0.0, 3.0]),
        Vector::new(vec![1.0, 1.0, 1.0]),
        Vector::new(vec![-1.0, 0.5, 0.0]),
        Vector::new(vec![0.5, 3.0, 0.2]),
    ];
    let embeddings =
        EmbeddingStore::new(users, items, 3, products.len(), ItemNormalization::Normalize)
            .unwrap();
    let quality = QualityScoreTable::from_records([
        (101, 0.9),
        (202, 0.2),
        (303, 0.8),
        (404, 0.1),
        (505, 0.5),
    ])
    .unwrap();
    let index = make_index(&embeddings);

    RecommendationContext::new(
        products,
        IdentifierMapping::identity(6),
        embeddings,
        quality,
        index,
    )
    .unwrap()
}

/// Index double that returns a fixed answer and counts calls. With
/// `panic_with` set, the first search panics instead.
pub(crate) struct ScriptedIndex {
    pub answer: Result<Vec<InternalIndex>>,
    pub panic_with: Option<&'static str>,
    pub calls: AtomicUsize,
    pub rows: usize,
    pub dim: usize,
}

impl ScriptedIndex {
    pub(crate) fn new(answer: Result<Vec<InternalIndex>>) -> Self {
        Self {
            answer,
            panic_with: None,
            calls: AtomicUsize::new(0),
            rows: 6,
            dim: 3,
        }
    }

    pub(crate) fn panicking(message: &'static str) -> Self {
        Self {
            panic_with: Some(message),
            ..Self::new(Ok(vec![0, 1, 2, 3]))
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AnnIndex for ScriptedIndex {
    fn search(&self, _query: &Vector, _k: usize) -> Result<Vec<InternalIndex>> {
        let previous = self.calls.fetch_add(1, Ordering::SeqCst);
        if let (Some(message), 0) = (self.panic_with, previous) {
            panic!("{}", message);
        }
        match &self.answer {
            Ok(indices) => Ok(indices.clone()),
            Err(e) => Err(nutrirank_core::Error::RetrievalFailure(e.to_string())),
        }
    }

    fn len(&self) -> usize {
        self.rows
    }

    fn dim(&self) -> usize {
        self.dim
    }
}
