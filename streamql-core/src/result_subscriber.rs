//! Result subscriber (spec §4.3).
//!
//! Consumes one driver `Result` and reduces it to a plain
//! `Stream<Item = Result<T>>` that [`crate::forwarder::forward`] can drain:
//! either the result's row-count stream directly, or its row stream mapped
//! into records through the binding layer. The choice between the two is
//! the "tagged variant" from spec §9's dynamic-dispatch design note — here,
//! simply two free functions selected by the caller rather than a runtime
//! tag, since which flavour a subscription uses is fixed for its whole
//! lifetime and known at the call site in [`crate::subscription`].

use crate::binding::Record;
use crate::driver::{Driver, DriverResultSet, MetaOf, ResultOf, RowOf};
use crate::error::{self, Result};
use crate::forwarder;
use crate::reactive::Subscriber;
use crate::row_adapter::RowAdapter;
use crate::subscription::SubscriptionCore;
use futures::StreamExt;
use std::sync::{Arc, Mutex as StdMutex};

/// Drains one result set's row-count stream (spec §4.3: "for each `Result`,
/// subscribes a fresh forwarder to `result.getRowsUpdated()`"). Generic
/// directly over `DriverResultSet` rather than over `D: Driver` since
/// `rows_updated` is the only thing this needs — the same function serves a
/// plain query's `ResultOf<D>` and a multi-statement batch's
/// `BatchResultOf<D>` without caring which.
pub async fn drain_row_count<R: DriverResultSet>(
    index: u64,
    result: R,
    core: Arc<SubscriptionCore>,
    subscriber: Arc<StdMutex<Box<dyn Subscriber<u64>>>>,
) -> Result<()> {
    forwarder::forward(index, result.rows_updated(), core, subscriber).await
}

/// Drains one `Result`'s row stream, mapping each row into a `Rec` through
/// the binding layer before forwarding it (spec §4.3: "calls
/// `result.map((row, meta) -> record)`").
pub async fn drain_record<D, Rec>(
    index: u64,
    result: ResultOf<D>,
    core: Arc<SubscriptionCore>,
    subscriber: Arc<StdMutex<Box<dyn Subscriber<Rec>>>>,
) -> Result<()>
where
    D: Driver,
    Rec: Record,
{
    let mapped = result
        .rows()
        .map(|item: Result<(RowOf<D>, Arc<MetaOf<D>>)>| item.and_then(|(row, _meta)| map_row::<D, Rec>(&row)));
    forwarder::forward(index, mapped, core, subscriber).await
}

/// Constructs an empty record through the library's record factory and
/// fills each field via its binding, consulting the static (per-type,
/// effectively per-statement) field list (spec §4.3, §9 "field list could
/// be cached" — here it always is, since `Record::fields` is not
/// recomputed per row or per query).
fn map_row<D, Rec>(row: &RowOf<D>) -> Result<Rec>
where
    D: Driver,
    Rec: Record,
{
    let mut record = Rec::empty();
    let mut ctx = RowAdapter::new(row);
    for field in Rec::fields() {
        field
            .get(&mut record, &mut ctx)
            .map_err(|err| error::mapping(err))?;
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::RecordField;
    use crate::driver::DriverRow;
    use crate::value::Value;

    #[derive(Default, Debug, PartialEq)]
    struct Count(i64);
    struct CountField;
    impl RecordField<Count> for CountField {
        fn get(&self, record: &mut Count, ctx: &mut RowAdapter<'_>) -> Result<()> {
            record.0 = ctx.get_i64(1);
            Ok(())
        }
    }
    impl Record for Count {
        fn empty() -> Self {
            Count::default()
        }
        fn fields() -> &'static [&'static dyn RecordField<Self>] {
            &[&CountField]
        }
    }

    struct FixedRow(Vec<Value>);
    impl DriverRow for FixedRow {
        fn get(&self, index0: usize) -> Result<Value> {
            Ok(self.0[index0].clone())
        }
    }

    #[test]
    fn binding_fills_record_from_a_row() {
        let row = FixedRow(vec![Value::Int64(9)]);
        let mut ctx = RowAdapter::new(&row);
        let mut record = Count::empty();
        for field in Count::fields() {
            field.get(&mut record, &mut ctx).unwrap();
        }
        assert_eq!(record, Count(9));
    }
}
