//! Benchmarks for the dispatch scheduler.
//!
//! Benchmarks cover:
//! - Bounded batch execution at different concurrency ceilings
//! - Nested work registered into a barrier
//! - End-to-end dispatch against the in-memory backends

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use futures::FutureExt;
use std::hint::black_box;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use campaign_dispatch::config::DispatchConfig;
use campaign_dispatch::core::{BoundedBatchExecutor, CampaignDispatcher, InMemoryLogSink, VariableRenderer};
use campaign_dispatch::infra::{InMemoryStore, InMemoryTaskQueue};
use campaign_dispatch::model::{
    Account, Campaign, CampaignStatus, Channel, Contact, ContactList, DisplayId, EmailTemplate,
    SenderIdentity, SmsTemplate,
};

use tokio::runtime::Runtime;

// ============================================================================
// Helper Functions
// ============================================================================

fn display_id(raw: &str) -> DisplayId {
    DisplayId::parse(raw).unwrap()
}

fn build_contact(id: i64) -> Contact {
    Contact {
        id,
        display_id: display_id(&format!("{:04}-c{id}", id % 10_000)),
        account_id: 1,
        email: if id % 3 == 0 {
            String::new()
        } else {
            format!("contact{id}@example.com")
        },
        phone: format!("+1555{id:07}"),
        first_name: format!("First{id}"),
        last_name: format!("Last{id}"),
    }
}

fn build_dispatcher(contacts: i64) -> CampaignDispatcher {
    let store = InMemoryStore::new();
    store.insert_account(Account {
        id: 1,
        display_id: display_id("0001-acct"),
        monthly_sms_cap: 1_000_000,
    });
    store.insert_contact_list(
        ContactList {
            id: 1,
            display_id: display_id("0001-list"),
            account_id: 1,
            handled: true,
        },
        (1..=contacts).map(build_contact).collect(),
    );
    store.insert_campaign(Campaign {
        id: 1,
        display_id: display_id("1000-bench"),
        account_id: 1,
        contact_list_id: 1,
        status: CampaignStatus::Pending,
        handled: false,
        handled_at: None,
        follow_up_channel: Channel::Sms,
        follow_up_delay_days: Some(3),
        is_test: false,
        execution_time_secs: None,
    });
    store.insert_sms_templates(
        1,
        vec![SmsTemplate {
            id: 1,
            content: "Hi ${{contact.firstName || 'there'}}".into(),
        }],
    );
    store.insert_email_templates(
        1,
        vec![EmailTemplate {
            id: 2,
            subject: "News for ${{contact.firstName}}".into(),
            components: serde_json::json!({ "text": "Dear ${{contact.lastName}}" }),
        }],
    );
    store.insert_senders(
        1,
        (1..=4)
            .map(|id| SenderIdentity {
                id,
                account_id: 1,
                address: format!("sender{id}@example.com"),
                provider: "smtp".into(),
                daily_limit: 200,
            })
            .collect(),
    );

    CampaignDispatcher::new(
        DispatchConfig::new(100_000, 500, "https://api.example.com"),
        Arc::new(store),
        Arc::new(InMemoryTaskQueue::new()),
        Arc::new(VariableRenderer),
        Arc::new(InMemoryLogSink::new(64)),
    )
}

// ============================================================================
// Batch Executor Benchmarks
// ============================================================================

fn bench_batch_concurrency(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_concurrency");
    let units = 1_000;
    group.throughput(Throughput::Elements(units as u64));

    for concurrency in [1usize, 10, 50, 200] {
        group.bench_with_input(
            BenchmarkId::from_parameter(concurrency),
            &concurrency,
            |b, &concurrency| {
                b.to_async(Runtime::new().unwrap()).iter(|| async move {
                    let done = AtomicUsize::new(0);
                    let done_ref = &done;
                    BoundedBatchExecutor::new(concurrency)
                        .run(units, move |_| {
                            async move {
                                done_ref.fetch_add(1, Ordering::Relaxed);
                                Ok(())
                            }
                            .boxed()
                        })
                        .await
                        .unwrap();
                    black_box(done.load(Ordering::Relaxed))
                });
            },
        );
    }

    group.finish();
}

fn bench_batch_nested_work(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_nested_work");

    group.bench_function("two_added_per_unit", |b| {
        b.to_async(Runtime::new().unwrap()).iter(|| async {
            let done = AtomicUsize::new(0);
            let done_ref = &done;
            BoundedBatchExecutor::new(50)
                .run(500, move |ctx| {
                    let nested = ctx.clone();
                    async move {
                        for _ in 0..2 {
                            nested.add(
                                async move {
                                    done_ref.fetch_add(1, Ordering::Relaxed);
                                    Ok(())
                                }
                                .boxed(),
                            );
                        }
                        Ok(())
                    }
                    .boxed()
                })
                .await
                .unwrap();
            black_box(done.load(Ordering::Relaxed))
        });
    });

    group.finish();
}

// ============================================================================
// End-to-End Benchmarks
// ============================================================================

fn bench_dispatch_end_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_end_to_end");
    group.sample_size(20);

    for contacts in [100i64, 1_000] {
        group.throughput(Throughput::Elements(contacts as u64));
        group.bench_with_input(BenchmarkId::from_parameter(contacts), &contacts, |b, &contacts| {
            b.to_async(Runtime::new().unwrap()).iter_batched(
                || build_dispatcher(contacts),
                |dispatcher| async move { black_box(dispatcher.dispatch("1000-bench").await.unwrap()) },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_batch_concurrency,
    bench_batch_nested_work,
    bench_dispatch_end_to_end,
);
criterion_main!(benches);
