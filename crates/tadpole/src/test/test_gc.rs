// Collector behaviour, directly on the heap and through scripts
use crate::gc::{GcConfig, GcObject, Heap, NoRoots};
use crate::value::{Closure, Function, Pair, Upvalue};
use crate::vm::{Vm, VmOption};
use crate::Value;
use std::rc::Rc;

fn pair(heap: &mut Heap, first: Value, second: Value) -> Value {
    Value::Object(heap.alloc(GcObject::Pair(Pair::new(first, second)), &NoRoots))
}

#[test]
fn test_threshold_triggers_exactly_one_collection() {
    let config = GcConfig::default();
    let floor = config.threshold_floor;
    let mut heap = Heap::new(config);

    for _ in 0..=floor {
        pair(&mut heap, Value::Nil, Value::Nil);
    }

    let stats = heap.stats();
    assert_eq!(stats.collections, 1);
    assert_eq!(stats.last_freed, floor);
    assert_eq!(stats.objects_allocated, floor + 1);
    // the one left is the allocation that triggered the collection
    assert_eq!(heap.object_count(), 1);
    heap.collect(&NoRoots);
    assert_eq!(heap.object_count(), 0);
    assert_eq!(heap.stats().collections, 2);
}

#[test]
fn test_threshold_scales_with_survivors() {
    let mut heap = Heap::new(GcConfig {
        threshold_floor: 4,
        growth_factor: 2,
        threshold_align: 8,
        enabled: false,
        stress: false,
    });
    let roots: Vec<Value> = (0..10).map(|_| pair(&mut heap, Value::Nil, Value::Nil)).collect();
    assert_eq!(heap.threshold(), 8);

    assert_eq!(heap.collect(&roots), 0);
    // 10 survivors * 2, rounded up to a multiple of 8
    assert_eq!(heap.threshold(), 24);
    assert_eq!(heap.stats().threshold, 24);

    assert_eq!(heap.collect(&NoRoots), 10);
    assert_eq!(heap.threshold(), 8);
}

#[test]
fn test_disabled_collector_never_runs_automatically() {
    let mut heap = Heap::new(GcConfig {
        threshold_floor: 4,
        threshold_align: 1,
        enabled: false,
        ..GcConfig::default()
    });
    for _ in 0..20 {
        pair(&mut heap, Value::Nil, Value::Nil);
    }
    assert_eq!(heap.stats().collections, 0);
    assert_eq!(heap.object_count(), 20);
}

#[test]
fn test_stress_collects_on_every_allocation() {
    let mut heap = Heap::new(GcConfig {
        stress: true,
        ..GcConfig::default()
    });
    for _ in 0..5 {
        pair(&mut heap, Value::Nil, Value::Nil);
    }
    assert_eq!(heap.stats().collections, 5);
    assert_eq!(heap.object_count(), 1);
}

#[test]
fn test_reachable_graph_survives() {
    let mut heap = Heap::default();
    let leaf = heap.intern("leaf", &NoRoots);
    let inner = pair(&mut heap, Value::Object(leaf), Value::Numeric(1.0));
    let outer = pair(&mut heap, inner, Value::Nil);
    let garbage = pair(&mut heap, Value::Nil, Value::Nil);

    assert_eq!(heap.collect(&vec![outer]), 1);
    assert!(heap.contains(leaf));
    assert!(heap.contains(inner.as_object().unwrap()));
    assert!(!heap.contains(garbage.as_object().unwrap()));
    assert!(!heap.header(outer.as_object().unwrap()).marked);
}

#[test]
fn test_unreachable_cycle_is_freed() {
    let mut heap = Heap::default();
    let a = pair(&mut heap, Value::Nil, Value::Nil);
    let b = pair(&mut heap, a, Value::Nil);
    heap.pair_mut(a.as_object().unwrap()).unwrap().second = b;

    assert_eq!(heap.collect(&vec![a]), 0);
    assert_eq!(heap.collect(&NoRoots), 2);
    assert_eq!(heap.object_count(), 0);
}

#[test]
fn test_closure_traces_function_and_upvalues() {
    let mut heap = Heap::default();
    let name = heap.intern("f", &NoRoots);
    let constant = heap.intern("constant", &NoRoots);
    let mut chunk = crate::Chunk::new();
    chunk.add_constant(Value::Object(constant));
    let function = heap.alloc(
        GcObject::Function(Function {
            name: Some(name),
            arity: 0,
            upvalue_count: 1,
            chunk: Rc::new(chunk),
        }),
        &NoRoots,
    );
    let captured = pair(&mut heap, Value::Nil, Value::Nil);
    let upvalue = heap.alloc(GcObject::Upvalue(Upvalue::Closed(captured)), &NoRoots);
    let closure = heap.alloc(
        GcObject::Closure(Closure::new(function, vec![upvalue])),
        &NoRoots,
    );

    assert_eq!(heap.collect(&vec![Value::Object(closure)]), 0);
    assert_eq!(heap.object_count(), 6);
    assert_eq!(heap.collect(&NoRoots), 6);
}

#[test]
fn test_open_upvalue_does_not_trace_stack_slot() {
    let mut heap = Heap::default();
    let upvalue = heap.alloc(GcObject::Upvalue(Upvalue::Open(0)), &NoRoots);
    let orphan = pair(&mut heap, Value::Nil, Value::Nil);
    assert_eq!(heap.collect(&vec![Value::Object(upvalue)]), 1);
    assert!(!heap.contains(orphan.as_object().unwrap()));
}

#[test]
fn test_vm_roots_keep_globals_alive() {
    let mut vm = Vm::default();
    let p = vm.create_pair(Value::Numeric(1.0), Value::Nil);
    vm.set_global("keep", p);
    vm.create_pair(Value::Nil, Value::Nil);

    assert!(vm.collect_garbage() >= 1);
    assert_eq!(vm.get_global("keep"), Some(p));
    assert!(vm.heap().contains(p.as_object().unwrap()));
    assert_eq!(vm.stringify(p), "(1, nil)");
}

#[test]
fn test_gc_builtins_from_script() {
    let mut vm = Vm::default();
    vm.open_libs();

    let freed = vm
        .interpret(
            r#"
            var p = pair(1, 2);
            set_second(p, p);
            p = nil;
            gc_collect()
            "#,
        )
        .unwrap();
    assert!(freed.as_numeric().unwrap() >= 1.0);

    assert_eq!(
        vm.interpret("gc_threshold(100); gc_threshold()").unwrap(),
        Value::Numeric(100.0)
    );
    assert_eq!(
        vm.interpret("gc_disable(); gc_isenabled()").unwrap(),
        Value::Boolean(false)
    );
    assert_eq!(
        vm.interpret("gc_enable(); gc_isenabled()").unwrap(),
        Value::Boolean(true)
    );

    let count = vm.interpret("gc_count()").unwrap().as_numeric().unwrap();
    assert_eq!(count as usize, vm.heap().object_count());
}

#[test]
fn test_scripts_survive_gc_stress() {
    let mut vm = Vm::new(VmOption::stress());
    vm.open_libs();
    let result = vm
        .interpret(
            r#"
            fn cons(a, b) { return pair(a, b); }
            var list = cons(1, cons(2, cons(3, nil)));
            var label = concat("list: ", list);
            fn keep(x) {
                fn get() { return x; }
                return get;
            }
            var g = keep(concat("a", "b"));
            concat(label, g())
            "#,
        )
        .unwrap();
    assert_eq!(vm.stringify(result), "list: (1, (2, (3, nil)))ab");
    assert!(vm.gc_stats().collections > 10);
}

#[test]
fn test_allocation_pressure_from_script() {
    let mut vm = Vm::new(VmOption {
        gc: GcConfig {
            threshold_floor: 64,
            threshold_align: 1,
            ..GcConfig::default()
        },
        ..VmOption::default()
    });
    vm.open_libs();
    vm.interpret(
        r#"
        var keep = pair(nil, nil);
        fn churn(a, b, c, d) {
            pair(a, b); pair(c, d); pair(a, d); pair(b, c);
            pair(a, b); pair(c, d); pair(a, d); pair(b, c);
            return pair(a, b);
        }
        fn round() {
            churn(1, 2, 3, 4); churn(1, 2, 3, 4); churn(1, 2, 3, 4);
            churn(1, 2, 3, 4); churn(1, 2, 3, 4); churn(1, 2, 3, 4);
            set_first(keep, churn(5, 6, 7, 8));
        }
        round(); round(); round(); round(); round(); round(); round(); round();
        "#,
    )
    .unwrap();

    let stats = vm.gc_stats();
    assert!(stats.collections >= 2);
    assert!(stats.objects_freed > 0);
    assert_eq!(
        vm.stringify(vm.get_global("keep").unwrap()),
        "((5, 6), nil)"
    );
}
