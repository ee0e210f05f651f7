//! Typed wrappers over the byte-level service views, encoding keys, values
//! and queue elements with bincode.

use {
    crate::{error::StateError, ReadableStates, WritableStates},
    serde::{de::DeserializeOwned, Serialize},
    std::marker::PhantomData,
};

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StateError> {
    Ok(bincode::serialize(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StateError> {
    Ok(bincode::deserialize(bytes)?)
}

pub struct ReadableKVState<'a, K, V> {
    states: &'a dyn ReadableStates,
    state_key: &'a str,
    _types: PhantomData<(K, V)>,
}

impl<'a, K: Serialize, V: DeserializeOwned> ReadableKVState<'a, K, V> {
    pub fn new(states: &'a dyn ReadableStates, state_key: &'a str) -> Self {
        Self {
            states,
            state_key,
            _types: PhantomData,
        }
    }

    pub fn get(&self, key: &K) -> Result<Option<V>, StateError> {
        self.states
            .get(self.state_key, &encode(key)?)
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    pub fn contains(&self, key: &K) -> Result<bool, StateError> {
        Ok(self.states.contains(self.state_key, &encode(key)?))
    }

    pub fn size(&self) -> usize {
        self.states.size(self.state_key)
    }
}

pub struct WritableKVState<'a, K, V> {
    states: &'a mut dyn WritableStates,
    state_key: &'a str,
    _types: PhantomData<(K, V)>,
}

impl<'a, K: Serialize + DeserializeOwned, V: Serialize + DeserializeOwned>
    WritableKVState<'a, K, V>
{
    pub fn new(states: &'a mut dyn WritableStates, state_key: &'a str) -> Self {
        Self {
            states,
            state_key,
            _types: PhantomData,
        }
    }

    pub fn get(&self, key: &K) -> Result<Option<V>, StateError> {
        self.states
            .get(self.state_key, &encode(key)?)
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    pub fn size(&self) -> usize {
        self.states.size(self.state_key)
    }

    pub fn put(&mut self, key: &K, value: &V) -> Result<(), StateError> {
        self.states.put(self.state_key, encode(key)?, encode(value)?);
        Ok(())
    }

    pub fn remove(&mut self, key: &K) -> Result<(), StateError> {
        self.states.remove(self.state_key, encode(key)?);
        Ok(())
    }

    /// Keys put or removed through this view.
    pub fn modified_keys(&self) -> Result<Vec<K>, StateError> {
        self.states
            .modified_keys(self.state_key)
            .iter()
            .map(|bytes| decode(bytes))
            .collect()
    }
}

pub struct ReadableSingletonState<'a, T> {
    states: &'a dyn ReadableStates,
    state_key: &'a str,
    _type: PhantomData<T>,
}

impl<'a, T: DeserializeOwned> ReadableSingletonState<'a, T> {
    pub fn new(states: &'a dyn ReadableStates, state_key: &'a str) -> Self {
        Self {
            states,
            state_key,
            _type: PhantomData,
        }
    }

    pub fn get(&self) -> Result<Option<T>, StateError> {
        self.states
            .singleton(self.state_key)
            .map(|bytes| decode(&bytes))
            .transpose()
    }
}

pub struct WritableSingletonState<'a, T> {
    states: &'a mut dyn WritableStates,
    state_key: &'a str,
    _type: PhantomData<T>,
}

impl<'a, T: Serialize + DeserializeOwned> WritableSingletonState<'a, T> {
    pub fn new(states: &'a mut dyn WritableStates, state_key: &'a str) -> Self {
        Self {
            states,
            state_key,
            _type: PhantomData,
        }
    }

    pub fn get(&self) -> Result<Option<T>, StateError> {
        self.states
            .singleton(self.state_key)
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    pub fn put(&mut self, value: &T) -> Result<(), StateError> {
        self.states.put_singleton(self.state_key, encode(value)?);
        Ok(())
    }
}

pub struct ReadableQueueState<'a, E> {
    states: &'a dyn ReadableStates,
    state_key: &'a str,
    _type: PhantomData<E>,
}

impl<'a, E: DeserializeOwned> ReadableQueueState<'a, E> {
    pub fn new(states: &'a dyn ReadableStates, state_key: &'a str) -> Self {
        Self {
            states,
            state_key,
            _type: PhantomData,
        }
    }

    pub fn peek(&self) -> Result<Option<E>, StateError> {
        self.states
            .queue(self.state_key)
            .first()
            .map(|bytes| decode(bytes))
            .transpose()
    }

    /// Every element, head first.
    pub fn elements(&self) -> Result<Vec<E>, StateError> {
        self.states
            .queue(self.state_key)
            .iter()
            .map(|bytes| decode(bytes))
            .collect()
    }
}

pub struct WritableQueueState<'a, E> {
    states: &'a mut dyn WritableStates,
    state_key: &'a str,
    _type: PhantomData<E>,
}

impl<'a, E: Serialize + DeserializeOwned> WritableQueueState<'a, E> {
    pub fn new(states: &'a mut dyn WritableStates, state_key: &'a str) -> Self {
        Self {
            states,
            state_key,
            _type: PhantomData,
        }
    }

    pub fn peek(&self) -> Result<Option<E>, StateError> {
        self.states
            .queue(self.state_key)
            .first()
            .map(|bytes| decode(bytes))
            .transpose()
    }

    pub fn add(&mut self, element: &E) -> Result<(), StateError> {
        self.states.add_to_queue(self.state_key, encode(element)?);
        Ok(())
    }

    pub fn poll(&mut self) -> Result<Option<E>, StateError> {
        self.states
            .poll_queue(self.state_key)
            .map(|bytes| decode(&bytes))
            .transpose()
    }
}
